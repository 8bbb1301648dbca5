//! Bounded retry with exponential backoff.
//!
//! [`RetryPolicy`] is the retry layer on its own; [`RetryingSource`] applies it
//! to every call of a [`CatalogSource`], so callers compose caching and retry
//! explicitly instead of relying on decorators.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::collectors::{CatalogPage, CatalogSource, RawRecord};
use crate::error::SourceResult;
use crate::metrics::MetricsCollector;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Upper bound on a single backoff delay in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

/// How many times, and how patiently, transient failures are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, Duration::ZERO)
    }

    /// Delay before retry number `retry` (1-based): base, 2*base, 4*base, ...
    /// capped at `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(retry - 1).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently, or retries run out.
    ///
    /// Only errors for which [`SourceError::is_transient`] holds are retried.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> SourceResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SourceResult<T>>,
    {
        let metrics = MetricsCollector::new();
        let mut retry = 0;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let delay = self.delay_for(retry);
                    tracing::warn!(
                        operation = operation,
                        retry = retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, will retry"
                    );
                    metrics.record_retry(operation);
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// A [`CatalogSource`] whose calls are retried under a [`RetryPolicy`].
pub struct RetryingSource {
    inner: Arc<dyn CatalogSource>,
    policy: RetryPolicy,
    metrics: MetricsCollector,
}

impl RetryingSource {
    pub fn new(inner: Arc<dyn CatalogSource>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn record<T>(&self, operation: &str, result: &SourceResult<T>) {
        let status = match result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        self.metrics.record_upstream(operation, status);
    }
}

#[async_trait]
impl CatalogSource for RetryingSource {
    fn source_id(&self) -> &str {
        self.inner.source_id()
    }

    async fn list_page(&self, cursor: Option<&str>) -> SourceResult<CatalogPage> {
        self.policy
            .run("list_page", || async move {
                let result = self.inner.list_page(cursor).await;
                self.record("list_page", &result);
                result
            })
            .await
    }

    async fn fetch_detail(&self, identifier: &str) -> SourceResult<RawRecord> {
        self.policy
            .run("fetch_detail", || async move {
                let result = self.inner.fetch_detail(identifier).await;
                self.record("fetch_detail", &result);
                result
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::ZERO, Duration::ZERO)
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_error_retried_until_success() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result = fast_policy(2)
            .run("op", || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(SourceError::SourceUnavailable("flaky".into()))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: SourceResult<()> = fast_policy(2)
            .run("op", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::SourceUnavailable("down".into()))
            })
            .await;

        assert!(matches!(result, Err(SourceError::SourceUnavailable(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: SourceResult<()> = fast_policy(5)
            .run("op", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::NotFound("tarrasque-prime".into()))
            })
            .await;

        assert_eq!(result, Err(SourceError::NotFound("tarrasque-prime".into())));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let _: SourceResult<()> = RetryPolicy::none()
            .run("op", || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::SourceUnavailable("down".into()))
            })
            .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
