use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for the listing pipeline. Shared between the poll loop, the
/// processor and the health endpoint.
#[derive(Debug)]
pub struct PipelineMetrics {
    polls: AtomicU64,
    poll_failures: AtomicU64,
    listings_discovered: AtomicU64,
    notified: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    /// Failed attempts, the final one of an exhausted listing included.
    rate_failures: AtomicU64,
    delivery_failures: AtomicU64,
    backlog: AtomicU64,
    known_listings: AtomicU64,
    start_time: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub polls: u64,
    pub poll_failures: u64,
    pub listings_discovered: u64,
    pub notified: u64,
    pub skipped: u64,
    pub failed: u64,
    pub rate_failures: u64,
    pub delivery_failures: u64,
    pub backlog: u64,
    pub known_listings: u64,
    pub uptime_secs: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            polls: AtomicU64::new(0),
            poll_failures: AtomicU64::new(0),
            listings_discovered: AtomicU64::new(0),
            notified: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rate_failures: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            backlog: AtomicU64::new(0),
            known_listings: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_poll(&self) {
        self.polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_failure(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_discovered(&self, count: usize) {
        self.listings_discovered
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_notified(&self) {
        self.notified.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_failure(&self) {
        self.rate_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_backlog(&self, len: usize) {
        self.backlog.store(len as u64, Ordering::Relaxed);
    }

    pub fn set_known_listings(&self, len: usize) {
        self.known_listings.store(len as u64, Ordering::Relaxed);
    }

    pub fn get_uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            listings_discovered: self.listings_discovered.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rate_failures: self.rate_failures.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            backlog: self.backlog.load(Ordering::Relaxed),
            known_listings: self.known_listings.load(Ordering::Relaxed),
            uptime_secs: self.get_uptime_secs(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}
