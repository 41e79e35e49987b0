use crate::analysis::balance::{BalanceReport, LoadBalancer};
use crate::analysis::pressure::{PressureStats, link_pressures};
use crate::analysis::sensitivity::SensitivityAnalyzer;
use crate::error::Result;
use crate::state::snapshot::{CrucialLink, FlowDelta, FlowMap};
use crossterm::event::KeyCode;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Flows,
    Deficits,
    Balance,
    NodeFailure,
    LinkRupture,
    CrucialLinks,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Flows,
        View::Deficits,
        View::Balance,
        View::NodeFailure,
        View::LinkRupture,
        View::CrucialLinks,
    ];

    pub fn title(self) -> &'static str {
        match self {
            View::Flows => "Flows",
            View::Deficits => "Deficits",
            View::Balance => "Balance",
            View::NodeFailure => "Node failure",
            View::LinkRupture => "Link rupture",
            View::CrucialLinks => "Crucial links",
        }
    }

    /// Views that need a target picked from a list before running.
    pub fn has_targets(self) -> bool {
        matches!(
            self,
            View::NodeFailure | View::LinkRupture | View::CrucialLinks
        )
    }
}

/// Result of the last action, shown in the main panel.
pub enum Outcome {
    Idle,
    Balanced(BalanceReport),
    Affected {
        target: String,
        deltas: Vec<FlowDelta>,
    },
    Crucial {
        consumer: String,
        links: Vec<CrucialLink>,
    },
    Failed(String),
}

pub struct App {
    pub analyzer: SensitivityAnalyzer,
    pub balancer: LoadBalancer,
    pub running: bool,
    pub view: View,
    pub selected: usize,
    pub outcome: Outcome,
    label: String,
    flows: FlowMap,
    deficits: FlowMap,
    pressure: PressureStats,
}

impl App {
    pub fn new(analyzer: SensitivityAnalyzer, balancer: LoadBalancer, label: String) -> Result<Self> {
        let mut app = Self {
            analyzer,
            balancer,
            running: true,
            view: View::Flows,
            selected: 0,
            outcome: Outcome::Idle,
            label,
            flows: FlowMap::new(),
            deficits: FlowMap::new(),
            pressure: PressureStats::default(),
        };
        app.refresh()?;
        Ok(app)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn flows(&self) -> &FlowMap {
        &self.flows
    }

    pub fn deficits(&self) -> &FlowMap {
        &self.deficits
    }

    /// Link pressure as of the last full solve or balancing pass.
    pub fn pressure(&self) -> &PressureStats {
        &self.pressure
    }

    fn refresh(&mut self) -> Result<()> {
        self.flows = self.analyzer.max_flow_to_all_consumers()?;
        self.deficits = self.analyzer.flow_deficits()?;
        self.pressure = self.analyzer.pressure_stats()?;
        Ok(())
    }

    /// Pickable targets for the current view, as displayed.
    pub fn targets(&self) -> Vec<String> {
        let graph = self.analyzer.graph();
        match self.view {
            View::NodeFailure => graph
                .all_nodes()
                .map(|(_, n)| n.code().to_string())
                .collect(),
            View::LinkRupture => link_pressures(graph)
                .into_iter()
                .map(|l| format!("{}->{}", l.origin, l.dest))
                .collect(),
            View::CrucialLinks => graph
                .consumers()
                .map(|(_, n)| n.code().to_string())
                .collect(),
            View::Flows | View::Deficits | View::Balance => Vec::new(),
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Char(c @ '1'..='6') => {
                let index = c as usize - '1' as usize;
                self.switch(View::ALL[index]);
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Char('b') => {
                self.switch(View::Balance);
                self.run();
            }
            KeyCode::Enter => self.run(),
            _ => {}
        }
    }

    fn switch(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.selected = 0;
            self.outcome = Outcome::Idle;
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.targets().len();
        if len == 0 {
            return;
        }
        self.selected = (self.selected as isize + delta).rem_euclid(len as isize) as usize;
    }

    /// Runs the action of the current view against the selected target.
    pub fn run(&mut self) {
        let target = self.targets().get(self.selected).cloned();
        let outcome = match (self.view, target) {
            (View::Balance, _) => self.rebalance().map(Outcome::Balanced),
            (View::NodeFailure, Some(code)) => self
                .analyzer
                .affected_by_node_failure(&code)
                .map(|deltas| Outcome::Affected {
                    target: code,
                    deltas,
                }),
            (View::LinkRupture, Some(link)) => {
                let (origin, dest) = link.split_once("->").unwrap_or((link.as_str(), ""));
                self.analyzer
                    .affected_by_edge_rupture(origin, dest)
                    .map(|deltas| Outcome::Affected {
                        target: link.clone(),
                        deltas,
                    })
            }
            (View::CrucialLinks, Some(consumer)) => self
                .analyzer
                .crucial_edges_to(&consumer)
                .map(|links| Outcome::Crucial { consumer, links }),
            (View::Flows | View::Deficits, _) => self.refresh().map(|_| Outcome::Idle),
            (_, None) => Ok(Outcome::Idle),
        };
        self.outcome = outcome.unwrap_or_else(|e| {
            warn!(error = %e, view = self.view.title(), "action failed");
            Outcome::Failed(e.to_string())
        });
    }

    fn rebalance(&mut self) -> Result<BalanceReport> {
        let report = self.analyzer.rebalance(&self.balancer)?;
        // re-solving here would overwrite the balanced link flows
        self.deficits = self
            .analyzer
            .graph()
            .consumers()
            .filter_map(|(_, n)| {
                let flow = report.flows.get(n.code()).copied().unwrap_or(0);
                let deficit = n.demand()?.saturating_sub(flow);
                (deficit > 0).then(|| (n.code().to_string(), deficit))
            })
            .collect();
        self.flows = report.flows.clone();
        self.pressure = self.analyzer.pressure_stats()?;
        Ok(report)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        ratatui::restore();
    }
}
