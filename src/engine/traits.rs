use super::category::BlockingCategory;
use super::hash::DomainHash;
use super::types::{Guidance, SiteEntry};
use crate::error::{DetectionErrorKind, StoreError};
use crate::recovery::RecoveryAction;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted block-list. Calls are synchronous and may fail; they must not
/// block indefinitely.
pub trait BlocklistStore: Send + Sync {
    /// `false` when the backing storage cannot be reached at all. The
    /// classifier then answers from the embedded list instead.
    fn is_available(&self) -> bool {
        true
    }

    fn lookup_by_hash(&self, hash: &DomainHash) -> StoreResult<Option<SiteEntry>>;

    /// Active non-regex entries whose pattern is a substring of `fragment`,
    /// or of which `fragment` is a substring.
    fn lookup_by_pattern_substring(&self, fragment: &str) -> StoreResult<Vec<SiteEntry>>;

    /// All active regex entries.
    fn lookup_regex_entries(&self) -> StoreResult<Vec<SiteEntry>>;

    /// Inserts or replaces the entry keyed by its hash.
    fn insert(&self, entry: SiteEntry) -> StoreResult<()>;

    /// Returns `false` when no active entry had that hash.
    fn deactivate(&self, hash: &DomainHash) -> StoreResult<bool>;

    fn count_user_added(&self) -> StoreResult<u64>;

    fn search_by_query(&self, query: &str) -> StoreResult<Vec<SiteEntry>>;
}

pub trait GuidanceStore: Send + Sync {
    fn random_guidance_for(&self, category: BlockingCategory) -> Option<Guidance>;
}

pub trait FalsePositiveSink: Send + Sync {
    fn record_report(
        &self,
        url_hash: &DomainHash,
        original_url: &str,
        reason: &str,
        timestamp: i64,
    ) -> StoreResult<()>;
}

/// Fire-and-forget diagnostics. Implementations must not panic or block.
pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, kind: &DetectionErrorKind, action: RecoveryAction, context: &str);
}
