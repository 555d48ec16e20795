//! Logboard - analytics dashboard over a marketplace event log
//!
//! Aggregates feature usage, response latency, time-on-task per section and
//! product categories from an event log store, and serves them as a page of
//! bar charts.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, store, bind failure, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod server;
mod store;

use analysis::{AggregationOptions, Aggregator};
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use report::DashboardRenderer;
use server::{AppState, DashboardServer};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Pick up a local .env before clap reads its env fallbacks
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Logboard v{}", env!("CARGO_PKG_VERSION"));
    debug!(
        "Arguments: store={:?} data_dir={:?} output={:?}",
        args.store, args.data_dir, args.output
    );

    if let Err(e) = run(args).await {
        error!("Logboard failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .logboard.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Connect to the store once, then either render a single dashboard or serve.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let store = store::connect(&config.store).context("Failed to connect to log store")?;
    let aggregator = Aggregator::new(store, AggregationOptions::from(&config.dashboard));
    let renderer = DashboardRenderer::new()?;

    if let Some(ref output_path) = args.output {
        let summary = aggregator.summarize().await?;

        let output = match args.format {
            OutputFormat::Html => renderer.render_html(&summary, &config.dashboard.title)?,
            OutputFormat::Json => report::generate_json_report(&summary)?,
        };

        std::fs::write(output_path, &output)
            .with_context(|| format!("Failed to write dashboard to {}", output_path.display()))?;

        info!("Dashboard saved to {}", output_path.display());
        return Ok(());
    }

    let state = AppState::new(aggregator, renderer, &config.dashboard.title);
    DashboardServer::new(&config.server.host, config.server.port, state)
        .start()
        .await
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
