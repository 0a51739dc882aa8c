use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{self, filter::EnvFilter};

use refactor_miner::{
    DeltaKey, DiffConfig, Refactoring, RefactoringDetector, SkippedFile, SourceSet,
    TracingObserver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Refactoring miner - detect refactorings between two versions of a program
#[derive(Parser, Debug)]
#[command(name = "refminer")]
#[command(about = "Detect refactorings between two source snapshots")]
#[command(version)]
struct Args {
    /// Directory holding the older snapshot
    #[arg(value_name = "BEFORE")]
    before: PathBuf,

    /// Directory holding the newer snapshot
    #[arg(value_name = "AFTER")]
    after: PathBuf,

    /// Configuration file (default: refminer.yml found upward from the current directory)
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    format: OutputFormat,

    /// Glob of files to load (can be specified multiple times)
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Maximum number of files parsed concurrently
    #[arg(long = "max-concurrency")]
    max_concurrency: Option<usize>,

    /// Maximum file size to load (in bytes)
    #[arg(long = "max-file-size")]
    max_file_size: Option<u64>,

    /// Also list removed and added entities no refactoring explains
    #[arg(long = "unexplained")]
    unexplained: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    refactorings: &'a [Refactoring],
    #[serde(skip_serializing_if = "Option::is_none")]
    unexplained: Option<&'a [DeltaKey]>,
    skipped: &'a [SkippedFile],
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::debug!("Starting with args: {:?}", args);

    let config = create_config_from_args(&args)?;
    let before = SourceSet::from_directory(&args.before, &config.include, config.max_file_size)?;
    let after = SourceSet::from_directory(&args.after, &config.include, config.max_file_size)?;
    tracing::info!(
        "Comparing {} files against {} files",
        before.len(),
        after.len()
    );

    let detector = RefactoringDetector::new(config).with_observer(Arc::new(TracingObserver));
    let detection = detector.detect_concurrent(&before, &after).await;

    match args.format {
        OutputFormat::Json => {
            let report = Report {
                refactorings: detection.refactorings(),
                unexplained: args.unexplained.then_some(detection.unexplained()),
                skipped: detection.skipped(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for refactoring in detection.refactorings() {
                println!("{refactoring}");
            }
            if args.unexplained {
                for delta in detection.unexplained() {
                    println!("Unexplained {}", serde_json::to_string(delta)?);
                }
            }
            for skipped in detection.skipped() {
                eprintln!("Skipped {}: {}", skipped.file, skipped.reason);
            }
        }
    }
    Ok(())
}

/// Configuration file (explicit or discovered) with command line overrides
fn create_config_from_args(args: &Args) -> Result<DiffConfig> {
    let mut config = match &args.config {
        Some(path) => DiffConfig::from_file(path)?,
        None => DiffConfig::load(&std::env::current_dir()?)?,
    };
    if !args.include.is_empty() {
        config.include = args.include.clone();
    }
    if let Some(max_concurrency) = args.max_concurrency {
        config.max_concurrency = max_concurrency.max(1);
    }
    if let Some(max_file_size) = args.max_file_size {
        config.max_file_size = max_file_size;
    }
    Ok(config)
}
