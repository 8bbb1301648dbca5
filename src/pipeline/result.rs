//! Run results, run states, and progress events.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FailureKind, ItemError};
use crate::validation::NormalizedRecord;

/// Stage of a run. Runs move strictly forward through these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Listing,
    Sampling,
    Fetching,
    Aggregating,
    Persisted,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Persisted | RunState::Failed)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Listing => "listing",
            RunState::Sampling => "sampling",
            RunState::Fetching => "fetching",
            RunState::Aggregating => "aggregating",
            RunState::Persisted => "persisted",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A sampled item that did not produce a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub identifier: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl ItemFailure {
    pub fn new(identifier: impl Into<String>, error: &ItemError) -> Self {
        Self {
            identifier: identifier.into(),
            kind: error.kind(),
            reason: error.to_string(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    /// Date the sample was seeded with.
    pub generated_for: NaiveDate,
    pub requested_count: usize,
    /// Successful records in sample order.
    pub records: Vec<NormalizedRecord>,
    /// Failed items in sample order.
    pub failures: Vec<ItemFailure>,
    pub finished_at: DateTime<Utc>,
}

impl PipelineResult {
    /// Number of items the run attempted.
    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Progress notifications emitted while a run executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    StateChanged { state: RunState },
    CatalogListed { entries: usize },
    SampleDrawn { date: NaiveDate, identifiers: Vec<String> },
    ItemSucceeded { identifier: String },
    ItemFailed { identifier: String, kind: FailureKind, reason: String },
    RunCompleted { records: usize, failures: usize },
}
