use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::monitoring::metrics::{MetricsSnapshot, PipelineMetrics};

pub const LISTING_SOURCE: &str = "listing_source";
pub const DEDUP_STORE: &str = "dedup_store";
pub const NOTIFIER: &str = "notifier";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, bool>,
    pub pipeline: MetricsSnapshot,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    components: Arc<RwLock<BTreeMap<String, bool>>>,
    metrics: Arc<PipelineMetrics>,
}

impl HealthChecker {
    pub fn new(metrics: Arc<PipelineMetrics>) -> Self {
        let components: BTreeMap<String, bool> = [LISTING_SOURCE, DEDUP_STORE, NOTIFIER]
            .into_iter()
            .map(|name| (name.to_string(), false))
            .collect();

        Self {
            start_time: std::time::Instant::now(),
            components: Arc::new(RwLock::new(components)),
            metrics,
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.components.read().await.clone();
        let healthy = [LISTING_SOURCE, DEDUP_STORE]
            .iter()
            .all(|name| components.get(*name).copied().unwrap_or(false));

        HealthStatus {
            status: if healthy {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
            pipeline: self.metrics.snapshot(),
        }
    }

    pub async fn update_component(&self, component: &str, healthy: bool) {
        self.components
            .write()
            .await
            .insert(component.to_string(), healthy);
    }
}
