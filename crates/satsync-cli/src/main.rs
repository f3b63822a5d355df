use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod lock;
mod sync;

use lock::RunLock;
use sync::SyncOptions;

#[derive(Debug, Parser)]
#[command(name = "satsync")]
#[command(about = "Saturn price sync for the shop catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Full pipeline: extract prices, apply markup, write, recalculate.
    Sync {
        /// Article list file instead of the destination catalog scan.
        #[arg(long)]
        skus_file: Option<PathBuf>,
        /// Cap the number of articles processed this run.
        #[arg(long)]
        batch_size: Option<usize>,
        /// Concurrent extraction workers.
        #[arg(long)]
        workers: Option<usize>,
        /// Where the extraction report is written.
        #[arg(long, default_value = "output/saturn_prices.csv")]
        output: PathBuf,
        /// Skip the dependent-tier recalculation after writing.
        #[arg(long)]
        no_recalc: bool,
    },
    /// Extraction stage only; writes the report file.
    Parse {
        #[arg(long)]
        skus_file: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long, default_value = "output/saturn_prices.csv")]
        output: PathBuf,
    },
    /// Markup/write stage over an existing report file.
    Process {
        /// Report produced by `parse` (or a previous `sync`).
        #[arg(long, default_value = "output/saturn_prices.csv")]
        input: PathBuf,
        #[arg(long)]
        no_recalc: bool,
    },
    /// Dependent-tier recalculation pass alone.
    Recalc,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = satsync_core::load_app_config_from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // One run per deployment; held until the process exits on any path.
    let _lock = RunLock::acquire(&config.lock_path)?;

    match cli.command {
        Commands::Sync {
            skus_file,
            batch_size,
            workers,
            output,
            no_recalc,
        } => {
            sync::run_sync(
                &config,
                SyncOptions {
                    skus_file,
                    batch_size,
                    workers,
                    output,
                    recalc: !no_recalc,
                },
            )
            .await
        }
        Commands::Parse {
            skus_file,
            batch_size,
            workers,
            output,
        } => {
            sync::run_parse(
                &config,
                SyncOptions {
                    skus_file,
                    batch_size,
                    workers,
                    output,
                    recalc: false,
                },
            )
            .await
        }
        Commands::Process { input, no_recalc } => {
            sync::run_process(&config, &input, !no_recalc).await
        }
        Commands::Recalc => sync::run_recalc(&config).await,
    }
}
