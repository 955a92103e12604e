use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::dedup_store::DedupStore;
use super::metrics::PipelineMetrics;
use super::pending_queue::PendingQueue;
use super::processor::{FailureReason, ListingProcessor, ProcessOutcome};
use crate::api::ListingSource;
use crate::core::health::{DEDUP_STORE, LISTING_SOURCE, NOTIFIER};
use crate::core::{HealthChecker, MonitorError};

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing was waiting after the refill.
    Idle,
    Processed {
        token_id: String,
        outcome: ProcessOutcome,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    /// Wait after an idle tick or a failed tick.
    pub idle: Duration,
    /// Wait after a tick that processed a listing.
    pub drain: Duration,
}

impl Default for PollIntervals {
    fn default() -> Self {
        Self {
            idle: Duration::from_secs(60),
            drain: Duration::from_secs(1),
        }
    }
}

/// Single-task scheduler: refill the backlog from the marketplace, then
/// process at most one listing per tick.
pub struct ListingMonitor {
    source: Arc<dyn ListingSource>,
    processor: ListingProcessor,
    store: Arc<dyn DedupStore>,
    known_ids: HashSet<String>,
    pending: PendingQueue,
    intervals: PollIntervals,
    /// Set when `known_ids` holds ids the store has not persisted yet.
    unsaved: bool,
    metrics: Arc<PipelineMetrics>,
    health: HealthChecker,
}

impl ListingMonitor {
    /// Loads the already-announced ids from `store`.
    pub async fn new(
        source: Arc<dyn ListingSource>,
        processor: ListingProcessor,
        store: Arc<dyn DedupStore>,
        intervals: PollIntervals,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self, MonitorError> {
        let known_ids = store.load().await?;
        let health = HealthChecker::new(metrics.clone());
        health.update_component(DEDUP_STORE, true).await;
        metrics.set_known_listings(known_ids.len());

        tracing::info!(known = known_ids.len(), "Loaded announced listings");

        Ok(Self {
            source,
            processor,
            store,
            known_ids,
            pending: PendingQueue::new(),
            intervals,
            unsaved: false,
            metrics,
            health,
        })
    }

    pub fn health(&self) -> HealthChecker {
        self.health.clone()
    }

    pub fn known_ids(&self) -> &HashSet<String> {
        &self.known_ids
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, token_id: &str) -> bool {
        self.pending.contains(token_id)
    }

    /// Runs forever. Tick errors are logged and followed by the idle wait.
    pub async fn run(&mut self) {
        tracing::info!(
            idle_interval_secs = self.intervals.idle.as_secs(),
            drain_interval_secs = self.intervals.drain.as_secs(),
            max_attempts = self.processor.retry_policy().max_attempts,
            "Listing monitor starting"
        );

        loop {
            let wait = match self.tick().await {
                Ok(TickOutcome::Processed { .. }) => self.intervals.drain,
                Ok(TickOutcome::Idle) => {
                    let snapshot = self.metrics.snapshot();
                    tracing::debug!(
                        known = snapshot.known_listings,
                        notified = snapshot.notified,
                        failed = snapshot.failed,
                        polls = snapshot.polls,
                        "Backlog empty"
                    );
                    self.intervals.idle
                }
                Err(e) => {
                    self.metrics.record_poll_failure();
                    tracing::error!(
                        error = %e,
                        backlog = self.pending.len(),
                        known = self.known_ids.len(),
                        "Poll tick failed"
                    );
                    self.intervals.idle
                }
            };

            tokio::time::sleep(wait).await;
        }
    }

    pub async fn tick(&mut self) -> Result<TickOutcome, MonitorError> {
        if self.unsaved {
            self.persist().await?;
        }

        let snapshot = match self.source.fetch_listings().await {
            Ok(snapshot) => {
                self.health.update_component(LISTING_SOURCE, true).await;
                snapshot
            }
            Err(e) => {
                self.health.update_component(LISTING_SOURCE, false).await;
                return Err(e.into());
            }
        };
        self.metrics.record_poll();

        let listed = snapshot.len();
        let added = self.pending.enqueue_new(snapshot, &self.known_ids);
        self.metrics.set_backlog(self.pending.len());
        if added > 0 {
            self.metrics.record_discovered(added);
            tracing::info!(
                added,
                listed,
                backlog = self.pending.len(),
                "New listings queued"
            );
        }

        let Some(listing) = self.pending.pop_front() else {
            return Ok(TickOutcome::Idle);
        };
        self.metrics.set_backlog(self.pending.len());

        let outcome = self.processor.process(&listing, &self.known_ids).await;

        match &outcome {
            ProcessOutcome::Succeeded(_) => {
                self.health.update_component(NOTIFIER, true).await;
                self.known_ids.insert(listing.token_id.clone());
                self.metrics.set_known_listings(self.known_ids.len());
                self.unsaved = true;
                self.persist().await?;
            }
            ProcessOutcome::Failed(FailureReason::DeliveryUnavailable) => {
                self.health.update_component(NOTIFIER, false).await;
            }
            ProcessOutcome::Failed(_) | ProcessOutcome::Skipped => {}
        }

        Ok(TickOutcome::Processed {
            token_id: listing.token_id,
            outcome,
        })
    }

    async fn persist(&mut self) -> Result<(), MonitorError> {
        match self.store.save(&self.known_ids).await {
            Ok(()) => {
                self.unsaved = false;
                self.health.update_component(DEDUP_STORE, true).await;
                Ok(())
            }
            Err(e) => {
                self.health.update_component(DEDUP_STORE, false).await;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::traits::{MockListingSource, MockNameResolver, MockNotifier, MockRateResolver};
    use crate::api::{Listing, ListingOrder};
    use crate::core::SourceError;
    use crate::monitoring::dedup_store::MemoryStore;
    use crate::monitoring::retry::RetryPolicy;
    use rust_decimal::Decimal;

    fn listing(token_id: &str) -> Listing {
        Listing {
            token_id: token_id.to_string(),
            owner: "0xABCDEF1234567890".to_string(),
            cdn_image: None,
            attributes: Default::default(),
            order: ListingOrder {
                base_price: "1000000000000000000".to_string(),
                expired_at: 0,
            },
        }
    }

    fn processor(rate: Decimal, delivered: bool, metrics: Arc<PipelineMetrics>) -> ListingProcessor {
        let mut rates = MockRateResolver::new();
        rates.expect_fetch_rate().returning(move |_| rate);
        let mut names = MockNameResolver::new();
        names.expect_resolve_name().returning(|_| None);
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().returning(move |_| delivered);

        ListingProcessor::new(
            Arc::new(rates),
            Arc::new(names),
            Arc::new(notifier),
            RetryPolicy {
                max_attempts: 2,
                delay: Duration::from_millis(10),
                ..RetryPolicy::default()
            },
            "ron",
            metrics,
        )
    }

    async fn monitor(
        source: MockListingSource,
        processor: ListingProcessor,
        store: Arc<MemoryStore>,
        metrics: Arc<PipelineMetrics>,
    ) -> ListingMonitor {
        ListingMonitor::new(
            Arc::new(source),
            processor,
            store,
            PollIntervals::default(),
            metrics,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_is_persisted_immediately() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .returning(|| Ok(vec![listing("1"), listing("2")]));
        let metrics = Arc::new(PipelineMetrics::new());
        let store = Arc::new(MemoryStore::new());
        let mut monitor = monitor(
            source,
            processor(Decimal::ONE, true, metrics.clone()),
            store.clone(),
            metrics,
        )
        .await;

        let outcome = monitor.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Processed { ref token_id, ref outcome } if token_id == "1" && outcome.is_success()
        ));
        assert!(store.snapshot().await.contains("1"));
        assert_eq!(store.save_count(), 1);
        assert_eq!(monitor.pending_len(), 1);

        monitor.tick().await.unwrap();
        assert_eq!(store.snapshot().await.len(), 2);
        assert_eq!(monitor.tick().await.unwrap(), TickOutcome::Idle);
    }

    #[tokio::test]
    async fn test_known_ids_are_never_queued() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .returning(|| Ok(vec![listing("1")]));
        let metrics = Arc::new(PipelineMetrics::new());
        let store = Arc::new(MemoryStore::with_ids(["1"]));
        let mut monitor = monitor(
            source,
            processor(Decimal::ONE, true, metrics.clone()),
            store.clone(),
            metrics,
        )
        .await;

        assert_eq!(monitor.tick().await.unwrap(), TickOutcome::Idle);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_source_failure_surfaces_as_tick_error() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .returning(|| Err(SourceError::InvalidResponse("boom".to_string())));
        let metrics = Arc::new(PipelineMetrics::new());
        let mut monitor = monitor(
            source,
            processor(Decimal::ONE, true, metrics.clone()),
            Arc::new(MemoryStore::new()),
            metrics,
        )
        .await;

        assert!(matches!(
            monitor.tick().await,
            Err(MonitorError::Source(_))
        ));
        let status = monitor.health().get_status().await;
        assert_eq!(status.components.get(LISTING_SOURCE), Some(&false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_listing_is_dropped_and_rediscovered() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .returning(|| Ok(vec![listing("1")]));
        let metrics = Arc::new(PipelineMetrics::new());
        let store = Arc::new(MemoryStore::new());
        let mut monitor = monitor(
            source,
            processor(Decimal::ZERO, true, metrics.clone()),
            store.clone(),
            metrics,
        )
        .await;

        let outcome = monitor.tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Processed {
                token_id: "1".to_string(),
                outcome: ProcessOutcome::Failed(FailureReason::RateUnavailable),
            }
        );
        assert!(monitor.known_ids().is_empty());
        assert_eq!(monitor.pending_len(), 0);

        // Next poll picks it up again.
        assert!(matches!(
            monitor.tick().await.unwrap(),
            TickOutcome::Processed { .. }
        ));
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_id_known_and_retries() {
        let mut source = MockListingSource::new();
        source
            .expect_fetch_listings()
            .returning(|| Ok(vec![listing("1")]));
        let metrics = Arc::new(PipelineMetrics::new());
        let store = Arc::new(MemoryStore::new());
        let mut monitor = monitor(
            source,
            processor(Decimal::ONE, true, metrics.clone()),
            store.clone(),
            metrics,
        )
        .await;

        store.set_failing(true);
        assert!(matches!(monitor.tick().await, Err(MonitorError::Store(_))));
        assert!(monitor.known_ids().contains("1"));
        assert!(store.snapshot().await.is_empty());

        store.set_failing(false);
        assert_eq!(monitor.tick().await.unwrap(), TickOutcome::Idle);
        assert!(store.snapshot().await.contains("1"));
    }
}
