use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use insolvency_reports::extract;
use insolvency_reports::{
    BatchRunner, Config, LocalEmitter, LocalRecordStore, NotificationService, RunContext,
};

#[derive(Parser)]
#[command(name = "insolvency-reports")]
#[command(about = "Insolvency announcement statistics and feature extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: .insolvency/config.yml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter the record store and publish all reports
    Run,

    /// Extract features from scraped .jsonl files
    Extract {
        /// Directory with the .jsonl files (overrides config)
        #[arg(long, env = "EXTRACT_INPUT_DIR")]
        input_dir: Option<PathBuf>,

        /// Directory for the exported CSV files (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Number of files processed at the same time (overrides config)
        #[arg(long)]
        workers: Option<usize>,

        /// Process files one after another
        #[arg(long, conflicts_with = "workers")]
        sequential: bool,
    },

    /// Count weekly proceeding openings in the exported features
    Analyze {
        /// Directory with the exported CSV files (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("insolvency_reports=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    }
    .with_env_overrides();

    match cli.command {
        Commands::Run => {
            run_batch(&config).await?;
        }
        Commands::Extract {
            input_dir,
            output_dir,
            workers,
            sequential,
        } => {
            let mut extract_config = config.extract.clone();
            if let Some(dir) = input_dir {
                extract_config.input_dir = dir;
            }
            if let Some(dir) = output_dir {
                extract_config.output_dir = dir;
            }
            if let Some(workers) = workers {
                extract_config.workers = workers;
            }

            let summary = if sequential {
                extract::run(&extract_config)?
            } else {
                extract::run_concurrent(&extract_config).await?
            };

            println!(
                "Extracted {} file(s), {} failed",
                summary.processed, summary.failed
            );
        }
        Commands::Analyze { output_dir } => {
            let dir = output_dir.unwrap_or_else(|| config.extract.output_dir.clone());
            analyze(&dir)?;
        }
    }

    Ok(())
}

async fn run_batch(config: &Config) -> Result<()> {
    let store = LocalRecordStore::new(&config.source.local_files)?;
    let emitter = LocalEmitter::new(&config.reports.output_dir, config.reports.archive)?;
    let mut ctx = RunContext::from_config(store, emitter, config)?;

    let runner = BatchRunner::new(NotificationService::new(&config.notifications.slack));
    let summary = runner.run(&mut ctx).await;

    if !summary.failed.is_empty() {
        info!(failed = ?summary.failed, "Some producers failed");
    }
    for name in &summary.changed {
        println!("  updated {}", name);
    }
    println!("{}", summary.message());

    Ok(())
}

fn analyze(output_dir: &std::path::Path) -> Result<()> {
    let summary = extract::analyze(output_dir)?;

    println!("All private cases:         {}", summary.all);
    println!("Unique by fingerprint:     {}", summary.fingerprinted);
    println!("Proceeding openings:       {}", summary.openings);
    println!();
    print!("{}", String::from_utf8_lossy(&summary.weekly.to_csv()?));

    Ok(())
}
