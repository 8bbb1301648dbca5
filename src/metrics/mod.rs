//! Metrics module for Prometheus-based monitoring.
//!
//! Counts cache effectiveness, upstream traffic, retries, and item outcomes.
//!
//! # Example
//!
//! ```ignore
//! use monster_forge::metrics::{init_metrics, export_metrics, MetricsCollector};
//!
//! init_metrics().expect("Failed to initialize metrics");
//! MetricsCollector::new().record_item("ok");
//! let text = export_metrics();
//! ```

pub mod collectors;
pub mod prometheus;

pub use collectors::{CacheOutcome, MetricsCollector};
pub use self::prometheus::{export_metrics, init_metrics};

pub use self::prometheus::{
    CACHE_LOOKUPS_TOTAL, ITEMS_TOTAL, REGISTRY, RETRIES_TOTAL, RUN_DURATION,
    UPSTREAM_REQUESTS_TOTAL,
};
