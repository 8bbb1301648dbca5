//! Prometheus metrics registration and export.
//!
//! This module defines all Prometheus metrics used by monster-forge and
//! provides functions for initializing, registering, and exporting them.

use ::prometheus::{CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Global Prometheus registry for all monster-forge metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Memoization lookups, labeled by operation and outcome (hit, miss, error).
pub static CACHE_LOOKUPS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Calls that reached the catalog source, labeled by operation and status.
pub static UPSTREAM_REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Retries of transient failures, labeled by operation.
pub static RETRIES_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Processed sample items, labeled by outcome.
pub static ITEMS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// Wall-clock duration of complete runs.
pub static RUN_DURATION: OnceLock<Histogram> = OnceLock::new();

/// Initialize all metrics and register them with the registry.
///
/// Safe to call more than once; later calls leave the first registry in place.
///
/// # Errors
///
/// Returns a `prometheus::Error` if a metric definition is invalid.
pub fn init_metrics() -> Result<(), ::prometheus::Error> {
    let registry = Registry::new();

    let cache_lookups = CounterVec::new(
        Opts::new("monster_forge_cache_lookups_total", "Memoization lookups"),
        &["operation", "outcome"],
    )?;

    let upstream_requests = CounterVec::new(
        Opts::new(
            "monster_forge_upstream_requests_total",
            "Calls issued to the catalog source",
        ),
        &["operation", "status"],
    )?;

    let retries = CounterVec::new(
        Opts::new("monster_forge_retries_total", "Retries of transient failures"),
        &["operation"],
    )?;

    let items = CounterVec::new(
        Opts::new("monster_forge_items_total", "Processed sample items"),
        &["outcome"],
    )?;

    let run_duration = Histogram::with_opts(
        HistogramOpts::new(
            "monster_forge_run_duration_seconds",
            "Pipeline run duration in seconds",
        )
        .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )?;

    registry.register(Box::new(cache_lookups.clone()))?;
    registry.register(Box::new(upstream_requests.clone()))?;
    registry.register(Box::new(retries.clone()))?;
    registry.register(Box::new(items.clone()))?;
    registry.register(Box::new(run_duration.clone()))?;

    let _ = REGISTRY.set(registry);
    let _ = CACHE_LOOKUPS_TOTAL.set(cache_lookups);
    let _ = UPSTREAM_REQUESTS_TOTAL.set(upstream_requests);
    let _ = RETRIES_TOTAL.set(retries);
    let _ = ITEMS_TOTAL.set(items);
    let _ = RUN_DURATION.set(run_duration);

    tracing::debug!("Prometheus metrics initialized");

    Ok(())
}

/// Export all registered metrics in Prometheus text format.
pub fn export_metrics() -> String {
    let Some(registry) = REGISTRY.get() else {
        return "# Metrics not initialized. Call init_metrics() first.\n".to_string();
    };

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return format!("# Error encoding metrics: {}\n", e);
    }

    String::from_utf8(buffer)
        .unwrap_or_else(|e| format!("# Error converting metrics to UTF-8: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_is_repeatable() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(REGISTRY.get().is_some());
    }

    #[test]
    fn test_export_after_recording() {
        let _ = init_metrics();
        if let Some(items) = ITEMS_TOTAL.get() {
            items.with_label_values(&["ok"]).inc();
        }

        let text = export_metrics();
        assert!(!text.starts_with("# Error"));
        assert!(text.contains("monster_forge_items_total"));
    }
}
