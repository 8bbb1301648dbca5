//! Pipeline orchestration for daily monster sampling.
//!
//! # Pipeline Flow
//!
//! 1. **Listing**: the full catalog is listed (memoized per day when enabled)
//! 2. **Sampling**: a date-seeded sample of `count` identifiers is drawn
//! 3. **Fetching**: each item is fetched through the cache and validated,
//!    concurrently and bounded by `max_concurrency`
//! 4. **Aggregating**: records and failures are collected in sample order
//! 5. **Persisted**: the result is handed to an [`crate::export::ArtifactWriter`]
//!
//! A failed listing ends the run in `Failed` with nothing written. Failed
//! items are recorded and never abort the run.
//!
//! # Example
//!
//! ```rust,ignore
//! use monster_forge::pipeline::{PipelineConfig, PipelineRunner};
//!
//! let config = PipelineConfig::from_env()?;
//! let runner = PipelineRunner::new(source, cache, &config);
//! let writer = JsonArtifactWriter::new(&config.output_path);
//! let result = runner.run(date, 5, &writer, None).await?;
//! println!("{} records, {} failures", result.records.len(), result.failures.len());
//! ```

pub mod config;
pub mod result;
pub mod runner;

pub use config::{ConfigError, PipelineConfig};
pub use result::{ItemFailure, PipelineEvent, PipelineResult, RunState};
pub use runner::PipelineRunner;
