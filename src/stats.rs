use crate::engine::{BlockingCategory, ClassificationResult, MatchTier};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};
use tracing::info;

#[derive(Debug)]
pub struct EngineStats {
    classifications: AtomicU64,
    blocked: AtomicU64,
    cache_hits: AtomicU64,
    fail_closed: AtomicU64,

    // Indexed by BlockingCategory::index()
    blocked_by_category: [AtomicU64; 6],

    enforcements: AtomicU64,
    false_positive_reports: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub classifications: u64,
    pub blocked: u64,
    pub cache_hits: u64,
    pub fail_closed: u64,
    pub blocked_by_category: Vec<(BlockingCategory, u64)>,
    pub enforcements: u64,
    pub false_positive_reports: u64,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self {
            classifications: AtomicU64::new(0),
            blocked: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            fail_closed: AtomicU64::new(0),
            blocked_by_category: [0; 6].map(|_| AtomicU64::new(0)),
            enforcements: AtomicU64::new(0),
            false_positive_reports: AtomicU64::new(0),
        }
    }
}

impl EngineStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Periodically dumps a summary line. Requires a tokio runtime.
    pub fn spawn_reporter(self: &Arc<Self>, interval_secs: u64) -> JoinHandle<()> {
        let stats = Arc::clone(self);
        let period = Duration::from_secs(interval_secs.max(1));
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            // First tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                stats.dump_stats();
            }
        })
    }

    pub fn record_classification(&self, result: &ClassificationResult, from_cache: bool) {
        self.classifications.fetch_add(1, Ordering::Relaxed);
        if from_cache {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        if !result.is_blocked {
            return;
        }
        self.blocked.fetch_add(1, Ordering::Relaxed);
        if result.tier == MatchTier::FailClosed {
            self.fail_closed.fetch_add(1, Ordering::Relaxed);
        }
        if let Some(category) = result.category {
            self.blocked_by_category[category.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_enforcements(&self) {
        self.enforcements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_false_positive_reports(&self) {
        self.false_positive_reports.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            classifications: self.classifications.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            fail_closed: self.fail_closed.load(Ordering::Relaxed),
            blocked_by_category: BlockingCategory::ALL
                .iter()
                .map(|c| (*c, self.blocked_by_category[c.index()].load(Ordering::Relaxed)))
                .filter(|(_, n)| *n > 0)
                .collect(),
            enforcements: self.enforcements.load(Ordering::Relaxed),
            false_positive_reports: self.false_positive_reports.load(Ordering::Relaxed),
        }
    }

    pub fn dump_stats(&self) {
        let snap = self.snapshot();
        let pct = |n: u64| {
            if snap.classifications > 0 {
                (n as f64 / snap.classifications as f64) * 100.0
            } else {
                0.0
            }
        };

        let mut category_stats = String::new();
        for (category, count) in &snap.blocked_by_category {
            category_stats.push_str(&format!("[{}: {}] ", category, count));
        }

        info!(
            "STATS DUMP: Total: {}, Blocked: {} ({:.1}%), CacheHits: {} ({:.1}%), FailClosed: {}, Enforced: {}, Reports: {} {}",
            snap.classifications,
            snap.blocked,
            pct(snap.blocked),
            snap.cache_hits,
            pct(snap.cache_hits),
            snap.fail_closed,
            snap.enforcements,
            snap.false_positive_reports,
            category_stats
        );
    }
}
