//! monster-forge: reproducible daily sampling of a remote catalog.
//!
//! Lists the D&D 5e SRD monster catalog, draws a date-seeded sample, fetches
//! each sampled record through a durable SQLite memoization cache with
//! bounded retry, validates and normalizes the records, and writes them as a
//! JSON artifact.

// Core modules
pub mod cache;
pub mod cli;
pub mod collectors;
pub mod error;
pub mod export;
pub mod fetch;
pub mod metrics;
pub mod pipeline;
pub mod sampling;
pub mod validation;

// Re-export commonly used error types
pub use error::{
    CacheError, ExportError, FailureKind, ItemError, PipelineError, SourceError, ValidationError,
};
