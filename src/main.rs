use clap::{Args, Parser, Subcommand};
use configuration::{Config, StorageBackend, load_config_from, telemetry::init_tracing};
use std::path::PathBuf;
use web_server::AppState;

mod render;

/// The main entry point for the Vantage query log and analytics service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = load_config_from(&cli.config)?;
    let _log_guard = init_tracing(&config.logging)?;

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            web_server::run_server(&config).await
        }
        Commands::Migrate => handle_migrate(&config).await,
        Commands::Report(args) => handle_report(args, &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Query logging and analytics for the trading-assistant API.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Apply pending database migrations and exit.
    Migrate,
    /// Print the comprehensive analytics report.
    Report(ReportArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Override the listening port.
    #[arg(long)]
    port: Option<u16>,

    /// Override both the store and cache backends.
    #[arg(long, value_enum)]
    backend: Option<StorageBackend>,
}

impl ServeArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(backend) = self.backend {
            config.store.backend = backend;
            config.cache.backend = backend;
        }
    }
}

#[derive(Args)]
struct ReportArgs {
    /// Length of the trailing window in days.
    #[arg(long, default_value_t = 30)]
    days: u32,

    /// Skip cached results and recompute every aggregation.
    #[arg(long)]
    no_cache: bool,

    /// Print the raw JSON report instead of tables.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    let pool = database::connect(&config.database).await?;
    database::run_migrations(&pool).await?;
    pool.close().await;
    tracing::info!("Database migrations applied.");
    Ok(())
}

async fn handle_report(args: ReportArgs, config: &Config) -> anyhow::Result<()> {
    let state = AppState::build(config).await?;
    let result = state.reports.comprehensive_report(Some(args.days), args.no_cache).await;
    state.shutdown().await;
    let report = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Analytics report generated {}",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{}", render::overview(&report));
    if !report.signals.top_symbols.is_empty() {
        println!("{}", render::top_symbols(&report));
    }
    if !report.signals.confidence_distribution.is_empty() {
        println!("{}", render::confidence_bands(&report));
    }
    for (i, recommendation) in report.recommendations.iter().enumerate() {
        println!("{}. {recommendation}", i + 1);
    }
    Ok(())
}
