pub mod dedup_store;
pub mod listing_monitor;
pub mod metrics;
pub mod pending_queue;
pub mod pricing;
pub mod processor;
pub mod retry;

pub use dedup_store::{DedupStore, JsonFileStore, MemoryStore};
pub use listing_monitor::{ListingMonitor, PollIntervals, TickOutcome};
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pending_queue::PendingQueue;
pub use processor::{FailureReason, ListingProcessor, ProcessOutcome};
pub use retry::{RetryBackoff, RetryPolicy};
