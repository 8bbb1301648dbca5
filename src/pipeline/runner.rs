//! Pipeline runner.
//!
//! Sequences one run: list the catalog, draw the day's sample, fetch and
//! validate every sampled item concurrently, aggregate in sample order, and
//! hand the result to the artifact writer.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::Sender;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::config::PipelineConfig;
use super::result::{ItemFailure, PipelineEvent, PipelineResult, RunState};
use crate::cache::CacheStore;
use crate::collectors::{CatalogLister, CatalogSource};
use crate::error::{ItemError, PipelineError};
use crate::export::ArtifactWriter;
use crate::fetch::{MemoizedFetcher, RetryingSource};
use crate::metrics::MetricsCollector;
use crate::sampling::{DailySampler, Sample};
use crate::validation::{validate, NormalizedRecord};

/// Runs the daily sampling pipeline against one catalog source.
pub struct PipelineRunner {
    lister: CatalogLister,
    fetcher: MemoizedFetcher,
    max_concurrency: usize,
    metrics: MetricsCollector,
}

impl PipelineRunner {
    /// Wire the layers together: every source call goes through the retry
    /// policy, and detail calls go through the cache before that.
    pub fn new(
        source: Arc<dyn CatalogSource>,
        cache: Arc<dyn CacheStore>,
        config: &PipelineConfig,
    ) -> Self {
        let retrying: Arc<dyn CatalogSource> =
            Arc::new(RetryingSource::new(source, config.retry_policy()));

        let mut lister = CatalogLister::new(retrying.clone()).with_max_pages(config.max_pages);
        if config.cache_catalog {
            lister = lister.with_cache(cache.clone());
        }

        Self {
            lister,
            fetcher: MemoizedFetcher::new(retrying, cache),
            max_concurrency: config.max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
            metrics: MetricsCollector::new(),
        }
    }

    /// List the catalog and draw the sample for `date`, without fetching.
    pub async fn sample_for(&self, date: NaiveDate, count: usize) -> Result<Sample, PipelineError> {
        let catalog = self
            .lister
            .list_for_day(date)
            .await
            .map_err(PipelineError::Catalog)?;
        Ok(DailySampler::for_date(date).sample(&catalog, count))
    }

    /// Fetch and validate one sampled item.
    pub async fn process_item(&self, identifier: &str) -> Result<NormalizedRecord, ItemError> {
        let raw = self.fetcher.fetch_detail(identifier).await?;
        Ok(validate(&raw)?)
    }

    /// Run every stage except persistence.
    pub async fn collect(
        &self,
        date: NaiveDate,
        count: usize,
        event_tx: &Option<Sender<PipelineEvent>>,
    ) -> Result<PipelineResult, PipelineError> {
        let run_id = Uuid::new_v4();
        tracing::info!(run_id = %run_id, date = %date, count = count, "Starting run");

        enter(event_tx, RunState::Listing).await;
        let catalog = match self.lister.list_for_day(date).await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(error = %e, "Catalog listing failed, aborting run");
                enter(event_tx, RunState::Failed).await;
                return Err(PipelineError::Catalog(e));
            }
        };
        emit(
            event_tx,
            PipelineEvent::CatalogListed {
                entries: catalog.len(),
            },
        )
        .await;

        enter(event_tx, RunState::Sampling).await;
        let sample = DailySampler::for_date(date).sample(&catalog, count);
        tracing::info!(
            sampled = sample.len(),
            catalog = catalog.len(),
            "Sample drawn"
        );
        emit(
            event_tx,
            PipelineEvent::SampleDrawn {
                date,
                identifiers: sample.identifiers.clone(),
            },
        )
        .await;

        enter(event_tx, RunState::Fetching).await;
        let semaphore = Semaphore::new(self.max_concurrency);
        let item_futures = sample.identifiers.iter().map(|identifier| {
            let semaphore = &semaphore;
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                let outcome = self.process_item(identifier).await;
                (identifier.as_str(), outcome)
            }
        });
        let outcomes = futures::future::join_all(item_futures).await;

        enter(event_tx, RunState::Aggregating).await;
        let mut records = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (identifier, outcome) in outcomes {
            match outcome {
                Ok(record) => {
                    self.metrics.record_item("ok");
                    emit(
                        event_tx,
                        PipelineEvent::ItemSucceeded {
                            identifier: identifier.to_string(),
                        },
                    )
                    .await;
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(identifier = %identifier, kind = %e.kind(), error = %e, "Item failed");
                    self.metrics.record_item(e.kind().as_str());
                    let failure = ItemFailure::new(identifier, &e);
                    emit(
                        event_tx,
                        PipelineEvent::ItemFailed {
                            identifier: failure.identifier.clone(),
                            kind: failure.kind,
                            reason: failure.reason.clone(),
                        },
                    )
                    .await;
                    failures.push(failure);
                }
            }
        }

        Ok(PipelineResult {
            run_id,
            generated_for: date,
            requested_count: count,
            records,
            failures,
            finished_at: Utc::now(),
        })
    }

    /// Run the whole pipeline and persist the result through `writer`.
    ///
    /// Per-item failures never fail the run; they are reported in
    /// [`PipelineResult::failures`]. Only a failed listing or a failed write
    /// is an error, and a failed listing writes nothing.
    pub async fn run(
        &self,
        date: NaiveDate,
        count: usize,
        writer: &dyn ArtifactWriter,
        event_tx: Option<Sender<PipelineEvent>>,
    ) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let result = self.collect(date, count, &event_tx).await?;

        if let Err(e) = writer.write(&result).await {
            tracing::error!(error = %e, "Failed to persist results");
            enter(&event_tx, RunState::Failed).await;
            return Err(e.into());
        }
        enter(&event_tx, RunState::Persisted).await;

        self.metrics.record_run(started.elapsed().as_secs_f64());
        tracing::info!(
            run_id = %result.run_id,
            records = result.records.len(),
            failures = result.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run completed"
        );
        emit(
            &event_tx,
            PipelineEvent::RunCompleted {
                records: result.records.len(),
                failures: result.failures.len(),
            },
        )
        .await;

        Ok(result)
    }
}

async fn enter(tx: &Option<Sender<PipelineEvent>>, state: RunState) {
    tracing::debug!(state = %state, "Run state changed");
    emit(tx, PipelineEvent::StateChanged { state }).await;
}

async fn emit(tx: &Option<Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(sender) = tx {
        let _ = sender.send(event).await;
    }
}
