//! fundetl CLI: run the statement pipeline or a single step.
//!
//! Commands:
//! - `run` (default): extract, transform, load, cleanup
//! - `extract`: fetch raw statements into the data lake
//! - `transform`: clean the raw extract into the data directory
//! - `clean`: remove local scratch files
//! - `config`: print the effective configuration as TOML

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fundetl_core::{Credentials, SaveMode};
use fundetl_runner::{Pipeline, PipelineConfig, PipelineReport, StorageKind};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "fundetl",
    about = "fundetl: quarterly financial statement ETL"
)]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Overrides applied on top of the config file.
#[derive(Args, Default)]
struct PipelineArgs {
    /// Path to a TOML config file. Defaults apply without one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Comma-separated symbols (e.g., JPM,GS,MS).
    #[arg(long, global = true, value_delimiter = ',')]
    symbols: Option<Vec<String>>,

    /// Cleaned output format: csv or parquet.
    #[arg(long, global = true)]
    save_mode: Option<SaveMode>,

    /// Directory for raw extracts.
    #[arg(long, global = true)]
    data_lake_dir: Option<PathBuf>,

    /// Directory for cleaned output.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Upload target: none, s3 or local.
    #[arg(long, global = true, value_parser = parse_storage_kind)]
    storage: Option<StorageKind>,

    /// Bucket for staging and warehouse objects.
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Leave local files in place after the run.
    #[arg(long, global = true, default_value_t = false)]
    keep_outputs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run extract, transform, load and cleanup in order.
    Run {
        /// Also write the run report as JSON to this path.
        #[arg(long)]
        report_json: Option<PathBuf>,
    },
    /// Fetch raw statements into the data lake.
    Extract,
    /// Clean the raw extract into the data directory.
    Transform,
    /// Remove local scratch files.
    Clean,
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli.pipeline)?;

    match cli.command.unwrap_or(Commands::Run { report_json: None }) {
        Commands::Run { report_json } => run_pipeline(config, report_json),
        Commands::Extract => run_extract(config),
        Commands::Transform => run_transform(config),
        Commands::Clean => run_clean(config),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_storage_kind(s: &str) -> Result<StorageKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "none" => Ok(StorageKind::None),
        "s3" => Ok(StorageKind::S3),
        "local" => Ok(StorageKind::Local),
        other => Err(format!("unknown storage '{other}'. Valid: none, s3, local")),
    }
}

fn load_config(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.validate().context("invalid configuration after CLI overrides")?;
    debug!(
        symbols = ?config.symbols,
        mode = %config.save_mode,
        storage = ?config.storage.kind,
        "effective configuration"
    );
    Ok(config)
}

fn apply_overrides(config: &mut PipelineConfig, args: &PipelineArgs) {
    if let Some(symbols) = &args.symbols {
        config.symbols = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
    }
    if let Some(mode) = args.save_mode {
        config.save_mode = mode;
    }
    if let Some(dir) = &args.data_lake_dir {
        config.data_lake_dir = dir.clone();
    }
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(kind) = args.storage {
        config.storage.kind = kind;
    }
    if let Some(bucket) = &args.bucket {
        config.storage.bucket = bucket.clone();
    }
    if args.keep_outputs {
        config.keep_outputs = true;
    }
}

fn build_pipeline(config: PipelineConfig) -> Result<Pipeline> {
    Pipeline::from_config(config, Credentials::from_env()).context("building pipeline")
}

fn run_pipeline(config: PipelineConfig, report_json: Option<PathBuf>) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let report = pipeline.run()?;

    print_summary(&report);

    if let Some(path) = report_json {
        std::fs::write(&path, report.to_json()?)
            .with_context(|| format!("writing report {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_extract(config: PipelineConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let path = pipeline.extract_data()?;
    println!("Raw extract written to: {}", path.display());
    Ok(())
}

fn run_transform(config: PipelineConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let cleaned = pipeline.transform_data()?;
    println!(
        "Cleaned {} rows x {} columns into: {}",
        cleaned.height(),
        cleaned.width(),
        pipeline.cleaned_path().display()
    );
    Ok(())
}

fn run_clean(config: PipelineConfig) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let removed = pipeline.remove_local_files()?;
    if removed.is_empty() {
        println!("Nothing to remove.");
    }
    for path in &removed {
        println!("Removed {}", path.display());
    }
    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("=== Pipeline Summary ===");
    println!("Statement:    {}", report.statement);
    println!("Symbols:      {}", report.symbols.join(", "));
    println!("Rows:         {}", report.rows);
    println!("Columns:      {}", report.columns.len());
    println!("Format:       {}", report.save_mode);
    println!("BLAKE3:       {}", report.cleaned_blake3);
    if report.remote_uris.is_empty() {
        println!("Uploads:      (disabled)");
    } else {
        for uri in &report.remote_uris {
            println!("Uploaded:     {uri}");
        }
    }
    println!("Elapsed:      {} ms", report.elapsed_ms());
}
