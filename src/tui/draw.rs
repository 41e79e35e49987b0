use crate::analysis::pressure::{PressureStats, Trend};
use crate::tui::app::{App, Outcome, View};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::Color::White;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Padding, Paragraph, Row, Table};

pub fn draw_app(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(build_header(app), chunks[0]);
    frame.render_widget(build_tabs(app), chunks[1]);
    frame.render_widget(build_help(), chunks[3]);

    if app.view.has_targets() {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(28), Constraint::Min(20)])
            .split(chunks[2]);
        frame.render_widget(build_target_table(app), body[0]);
        draw_outcome(frame, app, body[1]);
    } else {
        draw_outcome(frame, app, chunks[2]);
    }
}

fn deficit_style(deficit: u64) -> Style {
    if deficit == 0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn pressure_style(pressure: f64) -> Style {
    if pressure < 80.0 {
        Style::default().fg(Color::Green)
    } else if pressure < 100.0 {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn titled(title: impl std::fmt::Display) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(Line::from(vec![
            Span::from(format!(" {title} ")).style(Style::default().bold()),
        ]))
        .padding(Padding::horizontal(1))
}

fn header_row<const N: usize>(cells: [&'static str; N]) -> Row<'static> {
    Row::new(cells.map(Cell::from)).style(Style::default().bg(Color::DarkGray).fg(White))
}

fn build_header(app: &'_ App) -> Block<'_> {
    let total: u64 = app.flows().values().sum();
    let short = app.deficits().len();
    Block::new()
        .title(Line::from(vec![
            Span::raw(" Supplygraph ").style(Style::default().bold().cyan()),
            Span::raw(format!(" {} ", app.label()))
                .style(Style::default().add_modifier(Modifier::DIM)),
            Span::raw(" Inbound: ").style(Style::default().add_modifier(Modifier::DIM)),
            Span::raw(total.to_string()).style(Style::default().bold()),
            Span::raw("  Short: ").style(Style::default().add_modifier(Modifier::DIM)),
            Span::raw(short.to_string()).style(deficit_style(short as u64)),
            Span::raw(" "),
        ]))
        .title_alignment(Alignment::Center)
}

fn build_tabs(app: &App) -> Paragraph<'static> {
    let spans = View::ALL
        .iter()
        .enumerate()
        .flat_map(|(i, view)| {
            let style = if *view == app.view {
                Style::default().bold().black().on_cyan()
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            [
                Span::raw(format!(" {} {} ", i + 1, view.title())).style(style),
                Span::raw(" "),
            ]
        })
        .collect::<Vec<_>>();
    Paragraph::new(Line::from(spans))
}

fn build_help() -> Paragraph<'static> {
    Paragraph::new(Line::from(
        " 1-6 view  ↑↓/jk select  Enter run  b balance  q quit",
    ))
    .style(Style::default().add_modifier(Modifier::DIM))
}

fn build_target_table(app: &App) -> Table<'static> {
    let rows = app
        .targets()
        .into_iter()
        .enumerate()
        .map(|(i, target)| {
            let row = Row::new(vec![Cell::from(target)]);
            if i == app.selected {
                row.style(Style::default().bold().black().on_yellow())
            } else {
                row
            }
        })
        .collect::<Vec<_>>();
    let title = match app.view {
        View::CrucialLinks => "Consumers",
        View::LinkRupture => "Links",
        _ => "Nodes",
    };
    Table::new(rows, [Constraint::Min(10)]).block(titled(title))
}

fn draw_outcome(frame: &mut Frame, app: &App, area: Rect) {
    match (&app.outcome, app.view) {
        (Outcome::Failed(reason), _) => frame.render_widget(
            Paragraph::new(reason.clone())
                .style(Style::default().red())
                .block(titled("Error")),
            area,
        ),
        (Outcome::Balanced(report), View::Balance) => {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(6), Constraint::Min(3)])
                .split(area);
            frame.render_widget(build_balance_table(&report.before, &report.after), parts[0]);
            frame.render_widget(build_flow_table(app), parts[1]);
        }
        (Outcome::Affected { target, deltas }, _) => {
            let rows = deltas.iter().map(|d| {
                Row::new(vec![
                    Cell::from(d.code.clone()),
                    Cell::from(format!("{:>6}", d.old_flow)),
                    Cell::from(format!("{:>6}", d.new_flow)),
                    Cell::from(format!("{:>6}", d.old_flow - d.new_flow))
                        .style(Style::default().red()),
                ])
            });
            frame.render_widget(
                Table::new(
                    rows,
                    [
                        Constraint::Length(14),
                        Constraint::Length(8),
                        Constraint::Length(8),
                        Constraint::Length(8),
                    ],
                )
                .header(header_row(["Consumer", "   Old", "   New", "  Lost"]))
                .block(titled(format!("Affected by {target} ({})", deltas.len()))),
                area,
            );
        }
        (Outcome::Crucial { consumer, links }, _) => {
            let rows = links.iter().map(|l| {
                Row::new(vec![
                    Cell::from(format!("{} -> {}", l.origin, l.dest)),
                    Cell::from(format!("{:>6}", l.old_flow)),
                    Cell::from(format!("{:>6}", l.new_flow)),
                ])
            });
            frame.render_widget(
                Table::new(
                    rows,
                    [
                        Constraint::Length(22),
                        Constraint::Length(8),
                        Constraint::Length(8),
                    ],
                )
                .header(header_row(["Link", "   Old", "   New"]))
                .block(titled(format!("Crucial to {consumer} ({})", links.len()))),
                area,
            );
        }
        (_, View::Deficits) => frame.render_widget(build_deficit_table(app), area),
        (_, View::Balance) => {
            let stats = app.pressure();
            frame.render_widget(build_balance_table(stats, stats), area);
        }
        (_, View::Flows) => frame.render_widget(build_flow_table(app), area),
        _ => frame.render_widget(
            Paragraph::new("Pick a target and press Enter").block(titled(app.view.title())),
            area,
        ),
    }
}

fn build_flow_table(app: &App) -> Table<'_> {
    let rows = app.analyzer.graph().consumers().map(|(_, node)| {
        let flow = app.flows().get(node.code()).copied().unwrap_or(0);
        let demand = node.demand().unwrap_or(0);
        let served = if demand > 0 {
            100.0 * flow as f64 / demand as f64
        } else {
            100.0
        };
        Row::new(vec![
            Cell::from(node.code().to_owned()),
            Cell::from(node.name().unwrap_or_default().to_owned()),
            Cell::from(format!("{:>6}", demand)),
            Cell::from(format!("{:>6}", flow)),
            Cell::from(format!("{:>6.1}", served)).style(deficit_style(demand.saturating_sub(flow))),
        ])
    });
    Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(8),
        ],
    )
    .header(header_row(["Code", "Name", "Demand", "  Flow", "Served%"]))
    .block(titled("Consumer flows"))
}

fn build_deficit_table(app: &App) -> Table<'_> {
    let rows = app.deficits().iter().map(|(code, deficit)| {
        Row::new(vec![
            Cell::from(code.clone()),
            Cell::from(format!("{:>6}", deficit)).style(deficit_style(*deficit)),
        ])
    });
    Table::new(rows, [Constraint::Length(12), Constraint::Length(8)])
        .header(header_row(["Consumer", "Deficit"]))
        .block(titled(format!("Deficits ({})", app.deficits().len())))
}

fn build_balance_table(before: &PressureStats, after: &PressureStats) -> Table<'static> {
    let trend = match after.variance_trend(before, 0.01) {
        Trend::Up => "  ↗",
        Trend::Down => "  ↘",
        Trend::Flat => "  →",
    };
    let rows = [
        ("Mean %", before.mean, after.mean),
        ("Std dev", before.std_dev(), after.std_dev()),
        ("Max %", before.max, after.max),
    ]
    .map(|(label, was, now)| {
        Row::new(vec![
            Cell::from(label),
            Cell::from(format!("{:>7.2}", was)).style(pressure_style(was)),
            Cell::from(format!("{:>7.2}", now)).style(pressure_style(now)),
        ])
    });
    Table::new(
        rows,
        [Constraint::Length(10), Constraint::Length(9), Constraint::Length(9)],
    )
    .header(header_row(["Pressure", " Before", "  After"]))
    .block(titled(format!("Link pressure ({} links){trend}", after.links)))
}
