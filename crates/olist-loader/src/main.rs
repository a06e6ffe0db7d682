//! olist-loader - load the Olist CSV exports into PostgreSQL

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use olist_common::logging::{init_logging, LogConfig, LogLevel};
use olist_loader::{
    db, Config, ConfigError, Loader, Orchestrator, PgDestination, RunSummary, SchemaRegistry,
};
use tracing::{error, info};

/// Exit status when pre-flight checks fail
const EXIT_PREFLIGHT: u8 = 2;

/// Exit status when at least one dataset failed
const EXIT_ENTRY_FAILED: u8 = 1;

#[derive(Parser, Debug)]
#[command(name = "olist-loader")]
#[command(author, version, about = "Load the Olist CSV exports into PostgreSQL")]
struct Cli {
    /// Directory holding the CSV files (overrides OLIST_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Load only this dataset; repeat for several
    #[arg(long = "dataset", value_name = "NAME")]
    datasets: Vec<String>,

    /// Rows per insert statement (overrides LOAD_BATCH_SIZE)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Read and clean every file without connecting to the database
    #[arg(long)]
    dry_run: bool,

    /// Print the dataset registry and exit
    #[arg(long)]
    list: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _log_guard = init_logging(&log_config(cli.verbose)?)?;

    let registry = match SchemaRegistry::olist().select(&cli.datasets) {
        Ok(registry) => registry,
        Err(e) => return Ok(preflight_failed(e)),
    };

    if cli.list {
        print_registry(&registry);
        return Ok(ExitCode::SUCCESS);
    }

    match run(&cli, &registry).await {
        Ok(summary) if summary.has_failures() => Ok(ExitCode::from(EXIT_ENTRY_FAILED)),
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => Ok(preflight_failed(e)),
    }
}

/// `LOG_*` over the defaults; `--verbose` wins over `LOG_LEVEL`
fn log_config(verbose: bool) -> Result<LogConfig> {
    let mut config = LogConfig::builder()
        .log_file_prefix("olist-loader")
        .build()
        .merge_env()
        .context("Invalid LOG_* settings")?;
    if verbose {
        config.level = LogLevel::Debug;
    }
    Ok(config)
}

async fn run(cli: &Cli, registry: &SchemaRegistry) -> std::result::Result<RunSummary, ConfigError> {
    let mut config = Config::from_env()?;
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(batch_size) = cli.batch_size {
        config = config.with_batch_size(batch_size);
    }

    config.source.validate()?;
    let data_dir = config.source.data_dir()?.to_path_buf();

    if cli.dry_run {
        info!("Dry run: the database will not be touched");
        let mut orchestrator = Orchestrator::<PgDestination>::dry_run(data_dir);
        return Ok(orchestrator.run(registry).await);
    }

    config.database.validate()?;
    let pool = db::create_pool(&config.database).await?;
    db::health_check(&pool).await?;

    let loader = Loader::new(PgDestination::new(pool.clone())).with_batch_size(config.source.batch_size);
    let mut orchestrator = Orchestrator::new(data_dir, loader);
    let summary = orchestrator.run(registry).await;

    pool.close().await;
    Ok(summary)
}

fn preflight_failed(error: ConfigError) -> ExitCode {
    error!("{}", error);
    ExitCode::from(EXIT_PREFLIGHT)
}

fn print_registry(registry: &SchemaRegistry) {
    for spec in registry.iter() {
        println!("{:<22} {}", spec.name, spec.file);
        for column in spec.columns {
            println!("    {:<32} {:?}", column, spec.kind_of(column));
        }
    }
}
