use clap::Parser;
use policyforge::api;
use policyforge::config::{Config, RunOverrides};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};

mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-objective policy search over a NetLogo model", long_about = None)]
struct Cli {
    /// JSON configuration document
    config: PathBuf,

    #[arg(long, default_value_t = false)]
    debug: bool,

    #[command(flatten)]
    overrides: RunOverrides,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    info!("📂 Loading configuration: {}", cli.config.display());
    let mut config = Config::load_from_file(&cli.config).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });
    if let Err(e) = config.merge_overrides(&cli.overrides) {
        error!("❌ {}", e);
        process::exit(1);
    }

    info!("🧪 Model: {}", config.model_path.display());
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    info!(
        "🖥️  Detected {} CPUs, replicate pool uses up to {} workers",
        cpus,
        config.worker_threads()
    );

    match api::run_netlogo(&config) {
        Ok(report) => reports::print_front(&config.param_bounds, &report),
        Err(e) => {
            error!("\n❌ FATAL ERROR DURING OPTIMIZATION:");
            error!("   {}", e);
            process::exit(1);
        }
    }
}
