//! CLI command definitions for monster-forge.
//!
//! `monster-forge` with no subcommand behaves like `monster-forge run`.

use crate::cache::SqliteCacheStore;
use crate::collectors::Dnd5eClient;
use crate::export::JsonArtifactWriter;
use crate::metrics::{export_metrics, init_metrics};
use crate::pipeline::{PipelineConfig, PipelineEvent, PipelineResult, PipelineRunner};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Default number of monsters sampled per run.
const DEFAULT_COUNT: i64 = 5;

/// Daily monster sampler for the D&D 5e SRD API.
#[derive(Parser, Debug)]
#[command(name = "monster-forge")]
#[command(about = "Sample a reproducible daily set of D&D 5e monsters")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(
    long_about = "monster-forge lists every monster of the D&D 5e SRD API, draws a sample seeded by the date, fetches the sampled monsters through a local cache, validates them, and writes them to a JSON file.\n\nExample usage:\n  monster-forge run --count 5 --output monsters.json"
)]
pub struct Cli {
    /// The subcommand to execute. Defaults to `run`.
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and write the records artifact.
    Run(RunArgs),

    /// List the catalog and print the day's sample without fetching details.
    Sample(SampleArgs),

    /// Inspect the memoization cache.
    Cache(CacheArgs),
}

/// Options shared by every command that talks to the catalog.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Seed date (YYYY-MM-DD). Defaults to today's UTC date.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// SQLite cache database (default: monster_cache.db).
    #[arg(long)]
    pub cache_db: Option<PathBuf>,

    /// Catalog API base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Retries of transient failures per call.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Always list the catalog from the network instead of reusing today's snapshot.
    #[arg(long)]
    pub no_catalog_cache: bool,
}

/// Arguments for `monster-forge run`.
#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Number of monsters to sample. Negative values are treated as 0.
    #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT, allow_negative_numbers = true)]
    pub count: i64,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file for the records (default: monsters.json).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Maximum concurrent detail fetches.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Do not write the `.report.json` sidecar.
    #[arg(long)]
    pub no_report: bool,

    /// Write Prometheus metrics to this file after the run.
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `monster-forge sample`.
#[derive(clap::Args, Debug, Clone)]
pub struct SampleArgs {
    /// Number of monsters to sample. Negative values are treated as 0.
    #[arg(short = 'n', long, default_value_t = DEFAULT_COUNT, allow_negative_numbers = true)]
    pub count: i64,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `monster-forge cache`.
#[derive(clap::Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheSubcommand,
}

#[derive(clap::Subcommand, Debug)]
pub enum CacheSubcommand {
    /// Show the number and age of cached entries.
    Stats(CacheStatsArgs),
}

#[derive(clap::Args, Debug)]
pub struct CacheStatsArgs {
    /// SQLite cache database (default: monster_cache.db).
    #[arg(long)]
    pub cache_db: Option<PathBuf>,

    /// Output JSON.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Parse CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
///
/// For more control over logging initialization, use `parse_cli()` and `run_with_cli()`.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run(args)) => run_pipeline_command(args).await,
        Some(Commands::Sample(args)) => run_sample_command(args).await,
        Some(Commands::Cache(args)) => match args.command {
            CacheSubcommand::Stats(args) => run_cache_stats_command(args).await,
        },
        None => run_pipeline_command(cli.run).await,
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Clamp a requested count to the core's non-negative domain.
fn effective_count(count: i64) -> usize {
    if count < 0 {
        warn!(requested = count, "Negative count requested, sampling nothing");
        return 0;
    }
    usize::try_from(count).unwrap_or(usize::MAX)
}

fn run_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}

/// Environment configuration with command-line overrides applied.
fn build_config(source: &SourceArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env()?;
    if let Some(ref url) = source.base_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(ref path) = source.cache_db {
        config = config.with_cache_path(path.clone());
    }
    if let Some(retries) = source.max_retries {
        config = config.with_max_retries(retries);
    }
    if source.no_catalog_cache {
        config = config.with_catalog_cache(false);
    }
    Ok(config)
}

async fn open_cache(path: &std::path::Path) -> anyhow::Result<SqliteCacheStore> {
    SqliteCacheStore::open(&path.to_string_lossy())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open cache '{}': {}", path.display(), e))
}

async fn build_runner(config: &PipelineConfig) -> anyhow::Result<PipelineRunner> {
    let client = Dnd5eClient::with_base_url(config.base_url.clone(), config.request_timeout)?;
    let cache = open_cache(&config.cache_path).await?;
    Ok(PipelineRunner::new(Arc::new(client), Arc::new(cache), config))
}

// ============================================================================
// Command implementations
// ============================================================================

async fn run_pipeline_command(args: RunArgs) -> anyhow::Result<()> {
    let mut config = build_config(&args.source)?;
    if let Some(ref output) = args.output {
        config = config.with_output_path(output.clone());
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_max_concurrency(concurrency);
    }
    if args.no_report {
        config = config.with_report(false);
    }
    config.validate()?;

    if args.metrics_file.is_some() {
        init_metrics()?;
    }

    let date = run_date(args.source.date);
    let count = effective_count(args.count);
    let runner = build_runner(&config).await?;
    let writer = JsonArtifactWriter::new(config.output_path.clone()).with_report(config.write_report);

    let (tx, mut rx) = mpsc::channel::<PipelineEvent>(64);
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::StateChanged { state } => debug!(state = %state, "Stage"),
                PipelineEvent::CatalogListed { entries } => info!(entries, "Catalog ready"),
                PipelineEvent::ItemSucceeded { identifier } => {
                    debug!(identifier = %identifier, "Fetched")
                }
                PipelineEvent::ItemFailed {
                    identifier, kind, ..
                } => debug!(identifier = %identifier, kind = %kind, "Skipped"),
                _ => {}
            }
        }
    });

    let outcome = runner.run(date, count, &writer, Some(tx)).await;
    let _ = progress.await;

    if let Some(ref path) = args.metrics_file {
        std::fs::write(path, export_metrics())?;
    }

    let result = outcome?;
    print_run_summary(&result, &config.output_path, args.json)
}

fn print_run_summary(
    result: &PipelineResult,
    output_path: &std::path::Path,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        #[derive(Serialize)]
        struct RunOutput<'a> {
            status: &'static str,
            run_id: String,
            generated_for: String,
            requested: usize,
            records: usize,
            failures: &'a [crate::pipeline::ItemFailure],
            output: String,
        }

        let output = RunOutput {
            status: if result.is_complete() {
                "success"
            } else {
                "partial"
            },
            run_id: result.run_id.to_string(),
            generated_for: result.generated_for.to_string(),
            requested: result.requested_count,
            records: result.records.len(),
            failures: &result.failures,
            output: output_path.display().to_string(),
        };
        let json_output = serde_json::to_string_pretty(&output)
            .map_err(|e| anyhow::anyhow!("Failed to serialize JSON output: {}", e))?;
        println!("{}", json_output);
    } else {
        println!("✓ Monster sample for {} written", result.generated_for);
        println!("  Output: {}", output_path.display());
        println!(
            "  Monsters: {} requested, {} written, {} failed",
            result.requested_count,
            result.records.len(),
            result.failures.len()
        );
        for failure in &result.failures {
            println!("    {} ({}): {}", failure.identifier, failure.kind, failure.reason);
        }
    }
    Ok(())
}

async fn run_sample_command(args: SampleArgs) -> anyhow::Result<()> {
    let config = build_config(&args.source)?;
    config.validate()?;

    let date = run_date(args.source.date);
    let runner = build_runner(&config).await?;
    let sample = runner.sample_for(date, effective_count(args.count)).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sample)?);
    } else {
        println!("Sample for {} ({} monsters):", sample.seed_date, sample.len());
        for identifier in &sample.identifiers {
            println!("  {}", identifier);
        }
    }
    Ok(())
}

async fn run_cache_stats_command(args: CacheStatsArgs) -> anyhow::Result<()> {
    let path = match args.cache_db {
        Some(path) => path,
        None => PipelineConfig::from_env()?.cache_path,
    };
    let cache = open_cache(&path).await?;
    let stats = cache.stats().await?;

    if args.json {
        #[derive(Serialize)]
        struct StatsOutput {
            path: String,
            entries: u64,
            oldest: Option<String>,
            newest: Option<String>,
        }

        let output = StatsOutput {
            path: path.display().to_string(),
            entries: stats.entries,
            oldest: stats.oldest.map(|t| t.to_rfc3339()),
            newest: stats.newest.map(|t| t.to_rfc3339()),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Cache: {}", path.display());
        println!("  Entries: {}", stats.entries);
        if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
            println!("  Oldest:  {}", oldest.to_rfc3339());
            println!("  Newest:  {}", newest.to_rfc3339());
        }
    }
    Ok(())
}
