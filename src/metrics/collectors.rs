//! High-level recording interface over the raw Prometheus metrics.
//!
//! Every method is a no-op until [`super::init_metrics`] has run, so library
//! code can record unconditionally.

use super::prometheus::{
    CACHE_LOOKUPS_TOTAL, ITEMS_TOTAL, RETRIES_TOTAL, RUN_DURATION, UPSTREAM_REQUESTS_TOTAL,
};

/// Outcome of a memoization lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    Error,
}

impl CacheOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    pub fn record_cache_lookup(&self, operation: &str, outcome: CacheOutcome) {
        if let Some(lookups) = CACHE_LOOKUPS_TOTAL.get() {
            lookups
                .with_label_values(&[operation, outcome.as_str()])
                .inc();
        }
    }

    /// Record a call that reached the catalog source. `status` is "ok" or a
    /// failure kind.
    pub fn record_upstream(&self, operation: &str, status: &str) {
        if let Some(requests) = UPSTREAM_REQUESTS_TOTAL.get() {
            requests.with_label_values(&[operation, status]).inc();
        }
    }

    pub fn record_retry(&self, operation: &str) {
        if let Some(retries) = RETRIES_TOTAL.get() {
            retries.with_label_values(&[operation]).inc();
        }
    }

    /// Record a processed sample item. `outcome` is "ok" or a failure kind.
    pub fn record_item(&self, outcome: &str) {
        if let Some(items) = ITEMS_TOTAL.get() {
            items.with_label_values(&[outcome]).inc();
        }
    }

    pub fn record_run(&self, duration_secs: f64) {
        if let Some(duration) = RUN_DURATION.get() {
            duration.observe(duration_secs);
        }

        tracing::trace!(duration_secs = duration_secs, "Recorded run duration");
    }
}
