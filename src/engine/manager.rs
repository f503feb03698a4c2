use super::category::BlockingCategory;
use super::classifier::{ClassificationResult, TieredClassifier};
use super::hash::DomainHash;
use super::normalize::normalize;
use super::traits::{FalsePositiveSink, GuidanceStore};
use super::types::{Guidance, SiteEntry};
use crate::logger::{DecisionAction, DecisionLogEntry, DecisionLogger};
use crate::stats::EngineStats;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Operations offered to callers that need a blocking decision for an
/// address, plus the block-list mutations that go with it.
pub trait SiteBlocker: Send + Sync {
    /// Always produces a result; internal failures come back blocked.
    fn classify(&self, address: &str) -> ClassificationResult;

    fn is_blocked(&self, address: &str) -> bool {
        self.classify(address).is_blocked
    }

    fn category_of(&self, address: &str) -> Option<BlockingCategory> {
        self.classify(address).category
    }

    fn add_custom_entry(&self, address: &str, category: BlockingCategory) -> bool;

    fn remove_entry(&self, address: &str) -> bool;

    fn report_false_positive(&self, address: &str, reason: &str) -> bool;

    fn search(&self, query: &str) -> Vec<SiteEntry>;

    fn count_user_added(&self) -> u64;
}

/// Store-backed blocker: classification through the tiered classifier,
/// mutations through whatever store the classifier currently holds.
pub struct StandardBlocker {
    classifier: Arc<TieredClassifier>,
    reports: Option<Arc<dyn FalsePositiveSink>>,
    logger: Option<Arc<DecisionLogger>>,
    stats: Option<Arc<EngineStats>>,
    log_raw_domains: bool,
}

impl StandardBlocker {
    pub fn new(classifier: Arc<TieredClassifier>) -> Self {
        Self {
            classifier,
            reports: None,
            logger: None,
            stats: None,
            log_raw_domains: false,
        }
    }

    pub fn with_reports(mut self, reports: Arc<dyn FalsePositiveSink>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn with_logger(mut self, logger: Arc<DecisionLogger>, log_raw_domains: bool) -> Self {
        self.logger = Some(logger);
        self.log_raw_domains = log_raw_domains;
        self
    }

    pub fn with_stats(mut self, stats: Arc<EngineStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn classifier(&self) -> &Arc<TieredClassifier> {
        &self.classifier
    }

    fn record(&self, domain: &str, result: &ClassificationResult, from_cache: bool, start: Instant) {
        if let Some(stats) = &self.stats {
            stats.record_classification(result, from_cache);
        }

        if let Some(logger) = &self.logger {
            let domain = if self.log_raw_domains {
                domain.to_string()
            } else {
                DomainHash::of(domain).to_string()
            };
            logger.log(DecisionLogEntry {
                domain,
                action: DecisionAction::from_result(result),
                category: result.category,
                confidence: result.confidence,
                tier: result.tier,
                cached: from_cache,
                latency_us: start.elapsed().as_micros() as u64,
            });
        }
    }
}

impl SiteBlocker for StandardBlocker {
    fn classify(&self, address: &str) -> ClassificationResult {
        let start = Instant::now();
        let classified = self.classifier.classify_detailed(address);
        self.record(
            &classified.address.domain,
            &classified.result,
            classified.from_cache,
            start,
        );
        classified.result
    }

    fn add_custom_entry(&self, address: &str, category: BlockingCategory) -> bool {
        let address = normalize(address);
        if address.is_empty() {
            return false;
        }
        let Some(store) = self.classifier.store() else {
            warn!("Cannot add custom entry: no block-list store attached");
            return false;
        };

        match store.insert(SiteEntry::user(&address.domain, category)) {
            Ok(()) => {
                self.classifier.invalidate(&address.domain);
                info!("Added custom {} entry", category);
                true
            }
            Err(e) => {
                warn!("Failed to add custom entry: {}", e);
                false
            }
        }
    }

    fn remove_entry(&self, address: &str) -> bool {
        let address = normalize(address);
        if address.is_empty() {
            return false;
        }
        let Some(store) = self.classifier.store() else {
            return false;
        };

        let removed = match store.deactivate(&DomainHash::of(&address.domain)) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to remove entry: {}", e);
                false
            }
        };
        self.classifier.invalidate(&address.domain);
        removed
    }

    fn report_false_positive(&self, address: &str, reason: &str) -> bool {
        let normalized = normalize(address);
        if normalized.is_empty() {
            return false;
        }
        // The next lookup must re-evaluate regardless of whether the report
        // could be stored.
        self.classifier.invalidate(&normalized.domain);

        let Some(reports) = &self.reports else {
            warn!("False-positive report dropped: no report sink configured");
            return false;
        };

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();

        match reports.record_report(&DomainHash::of(&normalized.domain), address.trim(), reason, timestamp) {
            Ok(()) => {
                if let Some(stats) = &self.stats {
                    stats.inc_false_positive_reports();
                }
                true
            }
            Err(e) => {
                warn!("Failed to record false-positive report: {}", e);
                false
            }
        }
    }

    fn search(&self, query: &str) -> Vec<SiteEntry> {
        let Some(store) = self.classifier.store() else {
            return Vec::new();
        };
        store.search_by_query(query).unwrap_or_else(|e| {
            warn!("Block-list search failed: {}", e);
            Vec::new()
        })
    }

    fn count_user_added(&self) -> u64 {
        let Some(store) = self.classifier.store() else {
            return 0;
        };
        store.count_user_added().unwrap_or_else(|e| {
            warn!("Failed to count user entries: {}", e);
            0
        })
    }
}

/// A decision plus the guidance to show with it.
#[derive(Debug, Clone, Serialize)]
pub struct BlockDecision {
    pub result: ClassificationResult,
    pub guidance: Option<Guidance>,
}

/// Wraps a [`StandardBlocker`] and attaches guidance to blocked results.
/// Every other operation is forwarded to the base unchanged.
pub struct GuidedBlocker {
    base: StandardBlocker,
    guidance: Arc<dyn GuidanceStore>,
}

impl GuidedBlocker {
    pub fn new(base: StandardBlocker, guidance: Arc<dyn GuidanceStore>) -> Self {
        Self { base, guidance }
    }

    pub fn base(&self) -> &StandardBlocker {
        &self.base
    }

    pub fn decide(&self, address: &str) -> BlockDecision {
        let result = self.base.classify(address);
        let guidance = result.category.filter(|_| result.is_blocked).map(|category| {
            self.guidance
                .random_guidance_for(category)
                .unwrap_or_else(|| Guidance {
                    category,
                    locale: "en".to_string(),
                    text: "This content was blocked. Take a moment before continuing.".to_string(),
                    reference: category.guidance_ref().to_string(),
                })
        });
        BlockDecision { result, guidance }
    }
}

impl SiteBlocker for GuidedBlocker {
    fn classify(&self, address: &str) -> ClassificationResult {
        self.base.classify(address)
    }

    fn add_custom_entry(&self, address: &str, category: BlockingCategory) -> bool {
        self.base.add_custom_entry(address, category)
    }

    fn remove_entry(&self, address: &str) -> bool {
        self.base.remove_entry(address)
    }

    fn report_false_positive(&self, address: &str, reason: &str) -> bool {
        self.base.report_false_positive(address, reason)
    }

    fn search(&self, query: &str) -> Vec<SiteEntry> {
        self.base.search(query)
    }

    fn count_user_added(&self) -> u64 {
        self.base.count_user_added()
    }
}
