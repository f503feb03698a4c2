//! Single entry point bundling the site blocker, the activity monitor and the
//! recovery coordinator.

use crate::engine::{
    BlockDecision, BlockingCategory, ClassificationResult, GuidedBlocker, SiteBlocker, SiteEntry,
    TieredClassifier,
};
use crate::error::DetectionErrorKind;
use crate::monitor::ActivityMonitor;
use crate::recovery::{RecoveryAction, RecoveryCoordinator};
use crate::stats::{EngineStats, StatsSnapshot};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::warn;

pub struct ContentShield {
    blocker: GuidedBlocker,
    recovery: RecoveryCoordinator,
    stats: Arc<EngineStats>,
    monitor: Option<ActivityMonitor>,
}

impl ContentShield {
    pub fn new(
        blocker: GuidedBlocker,
        recovery: RecoveryCoordinator,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            blocker,
            recovery,
            stats,
            monitor: None,
        }
    }

    pub fn with_monitor(mut self, monitor: ActivityMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn classify(&self, address: &str) -> ClassificationResult {
        self.blocker.classify(address)
    }

    pub fn is_blocked(&self, address: &str) -> bool {
        self.blocker.is_blocked(address)
    }

    pub fn category_of(&self, address: &str) -> Option<BlockingCategory> {
        self.blocker.category_of(address)
    }

    /// Classification plus guidance to show when the address is blocked.
    pub fn decide(&self, address: &str) -> BlockDecision {
        self.blocker.decide(address)
    }

    pub fn add_custom_entry(&self, address: &str, category: BlockingCategory) -> bool {
        self.blocker.add_custom_entry(address, category)
    }

    pub fn remove_entry(&self, address: &str) -> bool {
        self.blocker.remove_entry(address)
    }

    pub fn report_false_positive(&self, address: &str, reason: &str) -> bool {
        self.blocker.report_false_positive(address, reason)
    }

    pub fn search(&self, query: &str) -> Vec<SiteEntry> {
        self.blocker.search(query)
    }

    pub fn count_user_added(&self) -> u64 {
        self.blocker.count_user_added()
    }

    /// Returns `false` when no activity monitor is attached or no tokio
    /// runtime is available to run it on.
    pub fn start_monitoring(&self) -> bool {
        match &self.monitor {
            Some(monitor) => monitor.start(),
            None => {
                warn!("No activity monitor configured");
                false
            }
        }
    }

    pub async fn stop_monitoring(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.stop().await;
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.as_ref().is_some_and(|m| m.is_monitoring())
    }

    pub fn handle_error(&self, kind: &DetectionErrorKind) -> RecoveryAction {
        self.recovery.handle_error(kind)
    }

    pub fn degrade(&self, kind: &DetectionErrorKind) -> bool {
        self.recovery.degrade(kind)
    }

    pub fn classifier(&self) -> &Arc<TieredClassifier> {
        self.blocker.base().classifier()
    }

    pub fn monitor(&self) -> Option<&ActivityMonitor> {
        self.monitor.as_ref()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn stats_dump(&self) {
        self.stats.dump_stats();
    }

    /// Logs a stats summary every `interval_secs`. Requires a tokio runtime.
    pub fn spawn_stats_reporter(&self, interval_secs: u64) -> JoinHandle<()> {
        self.stats.spawn_reporter(interval_secs)
    }
}
