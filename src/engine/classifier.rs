use super::cache::ResultCache;
use super::category::BlockingCategory;
use super::embedded::EmbeddedList;
use super::hash::DomainHash;
use super::matcher::PatternMatcher;
use super::normalize::{normalize, NormalizedAddress};
use super::traits::BlocklistStore;
use crate::error::DetectionErrorKind;
use crate::recovery::RecoveryCoordinator;
use arc_swap::ArcSwapOption;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

pub const HEURISTIC_CONFIDENCE: f32 = 0.6;

const HEURISTIC_KEYWORDS: &[(&str, BlockingCategory)] = &[
    ("porn", BlockingCategory::ExplicitContent),
    ("xxx", BlockingCategory::ExplicitContent),
    ("hentai", BlockingCategory::ExplicitContent),
    ("nsfw", BlockingCategory::ExplicitContent),
    ("onlyfans", BlockingCategory::AdultEntertainment),
    ("camgirl", BlockingCategory::AdultEntertainment),
    ("escort", BlockingCategory::AdultEntertainment),
    ("stripclub", BlockingCategory::AdultEntertainment),
    ("casino", BlockingCategory::Gambling),
    ("poker", BlockingCategory::Gambling),
    ("betting", BlockingCategory::Gambling),
    ("roulette", BlockingCategory::Gambling),
    ("hookup", BlockingCategory::DatingSites),
    ("sugardaddy", BlockingCategory::DatingSites),
    ("nudes", BlockingCategory::InappropriateImagery),
    ("deepnude", BlockingCategory::InappropriateImagery),
];

/// Which lookup produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExactHash,
    Pattern,
    Regex,
    Keyword,
    Embedded,
    FailClosed,
    NoMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub is_blocked: bool,
    pub category: Option<BlockingCategory>,
    pub confidence: f32,
    pub matched_pattern: Option<String>,
    pub reason: String,
    pub remediation_seconds: u32,
    pub tier: MatchTier,
}

impl ClassificationResult {
    pub fn allowed(reason: impl Into<String>) -> Self {
        Self {
            is_blocked: false,
            category: None,
            confidence: 0.0,
            matched_pattern: None,
            reason: reason.into(),
            remediation_seconds: 0,
            tier: MatchTier::NoMatch,
        }
    }

    pub fn blocked(
        category: BlockingCategory,
        confidence: f32,
        matched_pattern: Option<String>,
        reason: impl Into<String>,
        tier: MatchTier,
    ) -> Self {
        Self {
            is_blocked: true,
            category: Some(category),
            confidence: confidence.clamp(0.0, 1.0),
            matched_pattern,
            reason: reason.into(),
            remediation_seconds: category.remediation_seconds(),
            tier,
        }
    }

    /// Result returned when classification itself failed.
    pub fn fail_closed(reason: impl Into<String>) -> Self {
        Self::blocked(
            BlockingCategory::SuspiciousContent,
            1.0,
            None,
            reason,
            MatchTier::FailClosed,
        )
    }
}

/// A result together with the address it was computed for.
#[derive(Debug, Clone)]
pub struct Classified {
    pub address: NormalizedAddress,
    pub result: ClassificationResult,
    pub from_cache: bool,
}

/// Evaluates tiers in strict order and returns the first match:
/// exact hash, wildcard pattern, regex, heuristic keyword. When no store is
/// reachable the embedded list answers instead.
///
/// Internal failures are fail-closed: the caller gets a blocked
/// `SUSPICIOUS_CONTENT` result, never an error.
pub struct TieredClassifier {
    store: ArcSwapOption<Arc<dyn BlocklistStore>>,
    matcher: PatternMatcher,
    cache: Arc<ResultCache>,
    cache_enabled: bool,
    heuristics: bool,
    recovery: RecoveryCoordinator,
    evaluations: AtomicU64,
}

impl TieredClassifier {
    pub fn new(
        store: Option<Arc<dyn BlocklistStore>>,
        matcher: PatternMatcher,
        cache: Arc<ResultCache>,
        recovery: RecoveryCoordinator,
    ) -> Self {
        Self {
            store: ArcSwapOption::new(store.map(Arc::new)),
            matcher,
            cache,
            cache_enabled: true,
            heuristics: true,
            recovery,
            evaluations: AtomicU64::new(0),
        }
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_heuristics(mut self, enabled: bool) -> Self {
        self.heuristics = enabled;
        self
    }

    pub fn classify(&self, raw: &str) -> ClassificationResult {
        self.classify_detailed(raw).result
    }

    pub fn classify_detailed(&self, raw: &str) -> Classified {
        let address = normalize(raw);

        if address.is_empty() {
            return Classified {
                address,
                result: ClassificationResult::allowed("empty address"),
                from_cache: false,
            };
        }

        let cache_key = address.cache_key();
        if self.cache_enabled {
            if let Some(hit) = self.cache.get(&cache_key) {
                return Classified {
                    address,
                    result: hit,
                    from_cache: true,
                };
            }
        }

        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.evaluate(&address)))
            .unwrap_or_else(|_| {
                Err(DetectionErrorKind::ClassificationError(
                    "tier evaluation panicked".to_string(),
                ))
            });

        let result = match outcome {
            Ok(Evaluation::Persisted(result)) => {
                if self.cache_enabled {
                    self.cache.insert(&cache_key, result.clone());
                }
                result
            }
            // Degraded answers are not cached so the store is consulted
            // again once it comes back.
            Ok(Evaluation::Degraded(result)) => result,
            Err(kind) => {
                error!("Classification failed, blocking by default: {}", kind);
                self.recovery.handle_error(&kind);
                ClassificationResult::fail_closed(format!("classification failed: {}", kind))
            }
        };

        Classified {
            address,
            result,
            from_cache: false,
        }
    }

    fn evaluate(&self, address: &NormalizedAddress) -> Result<Evaluation, DetectionErrorKind> {
        match self.store() {
            Some(store) if store.is_available() => {
                self.evaluate_persisted(&*store, address).map(Evaluation::Persisted)
            }
            _ => {
                debug!("Block-list store unreachable, using embedded list");
                Ok(Evaluation::Degraded(self.evaluate_embedded(address)))
            }
        }
    }

    fn evaluate_persisted(
        &self,
        store: &dyn BlocklistStore,
        address: &NormalizedAddress,
    ) -> Result<ClassificationResult, DetectionErrorKind> {
        let domain = address.domain.as_str();
        let storage = |e: crate::error::StoreError| DetectionErrorKind::from(&e);

        // Tier 1: exact domain hash
        if let Some(entry) = store
            .lookup_by_hash(&DomainHash::of(domain))
            .map_err(storage)?
            .filter(|e| e.is_active)
        {
            return Ok(ClassificationResult::blocked(
                entry.category,
                entry.confidence,
                Some(entry.pattern),
                "exact domain match",
                MatchTier::ExactHash,
            ));
        }

        // Tier 2: wildcard / subdomain patterns
        if let Some(entry) = store
            .lookup_by_pattern_substring(domain)
            .map_err(storage)?
            .into_iter()
            .find(|e| e.is_active && !e.is_regex && self.matcher.wildcard_matches(domain, &e.pattern))
        {
            return Ok(ClassificationResult::blocked(
                entry.category,
                entry.confidence,
                Some(entry.pattern),
                "domain pattern match",
                MatchTier::Pattern,
            ));
        }

        // Tier 3: regular expressions over the full address
        if let Some(entry) = store
            .lookup_regex_entries()
            .map_err(storage)?
            .into_iter()
            .find(|e| e.is_active && e.is_regex && self.matcher.regex_matches(&address.full, &e.pattern))
        {
            return Ok(ClassificationResult::blocked(
                entry.category,
                entry.confidence,
                Some(entry.pattern),
                "regular expression match",
                MatchTier::Regex,
            ));
        }

        // Tier 4: keyword heuristics
        if self.heuristics {
            if let Some(result) = keyword_match(&address.full) {
                return Ok(result);
            }
        }

        Ok(ClassificationResult::allowed("no match"))
    }

    fn evaluate_embedded(&self, address: &NormalizedAddress) -> ClassificationResult {
        match EmbeddedList::get().check(address) {
            Some(m) => ClassificationResult::blocked(
                m.category,
                m.confidence,
                Some(m.matched),
                m.reason,
                MatchTier::Embedded,
            ),
            None => ClassificationResult::allowed("no match in embedded list"),
        }
    }

    /// Swaps the backing block-list and drops every cached result.
    pub fn replace_store(&self, store: Option<Arc<dyn BlocklistStore>>) {
        self.store.store(store.map(Arc::new));
        self.cache.clear();
    }

    pub fn store(&self) -> Option<Arc<dyn BlocklistStore>> {
        self.store.load_full().map(|s| Arc::clone(&*s))
    }

    /// Drops cached results for every address on `domain`.
    pub fn invalidate(&self, domain: &str) -> usize {
        self.cache.invalidate(domain)
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn recovery(&self) -> &RecoveryCoordinator {
        &self.recovery
    }

    /// Number of full tier evaluations, i.e. classifications not served
    /// from the cache.
    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }
}

enum Evaluation {
    Persisted(ClassificationResult),
    Degraded(ClassificationResult),
}

fn keyword_match(full_address: &str) -> Option<ClassificationResult> {
    let haystack = full_address.to_lowercase();
    HEURISTIC_KEYWORDS
        .iter()
        .find(|(keyword, _)| haystack.contains(keyword))
        .map(|(keyword, category)| {
            ClassificationResult::blocked(
                *category,
                HEURISTIC_CONFIDENCE,
                Some(keyword.to_string()),
                "suspicious keyword",
                MatchTier::Keyword,
            )
        })
}
