//! Error types for monster-forge operations.
//!
//! Defines the error taxonomy for every stage of a run:
//! - Catalog listing and detail retrieval (`SourceError`)
//! - Record validation and normalization (`ValidationError`)
//! - Memoization store I/O (`CacheError`)
//! - Artifact persistence (`ExportError`)
//! - Fatal, run-level failures (`PipelineError`)

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by the catalog source, for both listing and detail calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source could not be reached, timed out, or answered with a
    /// transient status (429, 5xx). Safe to retry.
    #[error("Catalog source unavailable: {0}")]
    SourceUnavailable(String),

    /// The requested identifier does not exist upstream.
    #[error("Item '{0}' not found in catalog source")]
    NotFound(String),

    /// The payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl SourceError {
    /// Whether a retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::SourceUnavailable(_))
    }

    /// Classification used in run reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            SourceError::SourceUnavailable(_) => FailureKind::SourceUnavailable,
            SourceError::NotFound(_) => FailureKind::NotFound,
            SourceError::MalformedResponse(_) => FailureKind::MalformedResponse,
        }
    }
}

/// Result type alias for catalog source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while validating a raw record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Required fields are missing or carry the wrong type.
    #[error("Schema violation in field(s): {}", .fields.join(", "))]
    SchemaViolation { fields: Vec<String> },

    /// A field is well-typed but outside its domain.
    #[error("Value out of range for '{field}': {reason}")]
    ValueOutOfRange { field: String, reason: String },
}

impl ValidationError {
    /// Classification used in run reports.
    pub fn kind(&self) -> FailureKind {
        match self {
            ValidationError::SchemaViolation { .. } => FailureKind::SchemaViolation,
            ValidationError::ValueOutOfRange { .. } => FailureKind::ValueOutOfRange,
        }
    }
}

/// Errors raised by a memoization store.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache entry could not be encoded: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache entry '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Errors raised while persisting a run's output.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write artifact '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single sampled item. Never aborts a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ItemError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ItemError::Source(e) => e.kind(),
            ItemError::Validation(e) => e.kind(),
        }
    }
}

/// Fatal errors that stop a run before anything is persisted.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Catalog listing failed: {0}")]
    Catalog(#[source] SourceError),

    #[error("Persisting results failed: {0}")]
    Export(#[from] ExportError),
}

/// Stable, serializable classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    SourceUnavailable,
    NotFound,
    MalformedResponse,
    SchemaViolation,
    ValueOutOfRange,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SourceUnavailable => "source_unavailable",
            FailureKind::NotFound => "not_found",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::SchemaViolation => "schema_violation",
            FailureKind::ValueOutOfRange => "value_out_of_range",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
