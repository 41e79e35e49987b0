use clap::{Parser, Subcommand};
use crossterm::event::{Event, KeyEventKind};
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use supplygraph::analysis::pressure::link_pressures;
use supplygraph::tui::app::App;
use supplygraph::tui::draw::draw_app;
use supplygraph::{
    AnalysisConfig, BasicNetwork, CsvDataset, LoadBalancer, NetworkSource, RandomNetwork,
    SensitivityAnalyzer,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "supplygraph: max-flow analysis of supply networks",
    long_about = None
)]
struct Cli {
    /// Directory holding sources.csv, routers.csv, consumers.csv and links.csv
    #[arg(long, conflicts_with = "random")]
    dataset: Option<PathBuf>,

    /// Generate a random network from this seed
    #[arg(long)]
    random: Option<u64>,

    /// Solve what-if scenarios in parallel
    #[arg(long)]
    parallel: bool,

    /// Multiplier on mean link pressure used as the balancing cap
    #[arg(long, default_value_t = 1.0)]
    headroom: f64,

    /// Write logs here instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive terminal UI (default)
    Tui,
    /// Print flows, deficits and pressure to stdout
    Report {
        /// Also list the links crucial to this consumer
        #[arg(long)]
        crucial: Option<String>,
    },
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
        None => registry.with(fmt::layer().compact()).init(),
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_ref())?;

    let source: Box<dyn NetworkSource> = match (&cli.dataset, cli.random) {
        (Some(dir), _) => Box::new(CsvDataset::new(dir)),
        (None, Some(seed)) => Box::new(RandomNetwork::new(seed)),
        (None, None) => Box::new(BasicNetwork),
    };
    let graph = source.build()?;
    info!(network = %source.describe(), "network ready");

    let config = AnalysisConfig {
        parallel: cli.parallel,
        balance_headroom: cli.headroom,
    };
    let balancer = LoadBalancer::default().with_headroom(config.balance_headroom);
    let analyzer = SensitivityAnalyzer::with_config(graph, config);

    match cli.command {
        Some(Command::Report { crucial }) => report(analyzer, &balancer, crucial.as_deref()),
        Some(Command::Tui) | None => run_tui(analyzer, balancer, source.describe()),
    }
}

fn run_tui(
    analyzer: SensitivityAnalyzer,
    balancer: LoadBalancer,
    label: String,
) -> Result<(), Box<dyn Error>> {
    let mut app = App::new(analyzer, balancer, label)?;
    let mut terminal = ratatui::init();

    while app.running {
        terminal.draw(|frame| draw_app(frame, &app))?;

        if crossterm::event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = crossterm::event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }
    }
    Ok(())
}

fn report(
    mut analyzer: SensitivityAnalyzer,
    balancer: &LoadBalancer,
    crucial: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let flows = analyzer.max_flow_to_all_consumers()?;
    println!("{:<12} {:>8} {:>8}", "consumer", "demand", "flow");
    for (_, node) in analyzer.graph().consumers() {
        let flow = flows.get(node.code()).copied().unwrap_or(0);
        println!(
            "{:<12} {:>8} {:>8}",
            node.code(),
            node.demand().unwrap_or(0),
            flow
        );
    }
    println!("total inbound: {}", flows.values().sum::<u64>());

    let deficits = analyzer.flow_deficits()?;
    if deficits.is_empty() {
        println!("\nall demand met");
    } else {
        println!("\n{} consumers short:", deficits.len());
        for (code, deficit) in &deficits {
            println!("  {code:<12} {deficit:>8}");
        }
    }

    if let Some(consumer) = crucial {
        let links = analyzer.crucial_edges_to(consumer)?;
        println!("\n{} links crucial to {consumer}:", links.len());
        for link in links {
            println!(
                "  {} -> {}  {} -> {}",
                link.origin, link.dest, link.old_flow, link.new_flow
            );
        }
    }

    let balanced = analyzer.rebalance(balancer)?;
    println!(
        "\npressure  mean {:.2} -> {:.2}  std dev {:.2} -> {:.2}  max {:.2} -> {:.2}",
        balanced.before.mean,
        balanced.after.mean,
        balanced.before.std_dev(),
        balanced.after.std_dev(),
        balanced.before.max,
        balanced.after.max,
    );
    let mut hottest = link_pressures(analyzer.graph());
    hottest.sort_by(|a, b| b.pressure.total_cmp(&a.pressure));
    for link in hottest.iter().take(5) {
        println!(
            "  {} -> {}  {}/{}  {:.1}%",
            link.origin, link.dest, link.flow, link.capacity, link.pressure
        );
    }
    Ok(())
}
