use crate::db::DbClient;
use crate::engine::{
    BlockingCategory, BlocklistStore, DomainHash, FalsePositiveReport, FalsePositiveSink, Guidance,
    GuidanceStore, SiteEntry, StoreResult,
};
use std::sync::Arc;
use tracing::warn;

/// Block-list, report sink and guidance store backed by the shared sqlite
/// database.
pub struct SqliteStore {
    db: Arc<DbClient>,
}

impl SqliteStore {
    pub fn new(db: Arc<DbClient>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Arc<DbClient> {
        &self.db
    }
}

impl BlocklistStore for SqliteStore {
    fn lookup_by_hash(&self, hash: &DomainHash) -> StoreResult<Option<SiteEntry>> {
        Ok(self.db.entry_by_hash(hash)?)
    }

    fn lookup_by_pattern_substring(&self, fragment: &str) -> StoreResult<Vec<SiteEntry>> {
        Ok(self.db.entries_matching_fragment(fragment)?)
    }

    fn lookup_regex_entries(&self) -> StoreResult<Vec<SiteEntry>> {
        Ok(self.db.regex_entries()?)
    }

    fn insert(&self, entry: SiteEntry) -> StoreResult<()> {
        Ok(self.db.upsert_entry(&entry)?)
    }

    fn deactivate(&self, hash: &DomainHash) -> StoreResult<bool> {
        Ok(self.db.deactivate_entry(hash)?)
    }

    fn count_user_added(&self) -> StoreResult<u64> {
        Ok(self.db.count_user_added()?)
    }

    fn search_by_query(&self, query: &str) -> StoreResult<Vec<SiteEntry>> {
        Ok(self.db.search_entries(query)?)
    }
}

impl FalsePositiveSink for SqliteStore {
    fn record_report(
        &self,
        url_hash: &DomainHash,
        original_url: &str,
        reason: &str,
        timestamp: i64,
    ) -> StoreResult<()> {
        let report = FalsePositiveReport {
            url_hash: url_hash.clone(),
            original_url: original_url.to_string(),
            reason: reason.to_string(),
            reported_at: timestamp,
        };
        Ok(self.db.insert_report(&report)?)
    }
}

impl GuidanceStore for SqliteStore {
    fn random_guidance_for(&self, category: BlockingCategory) -> Option<Guidance> {
        match self.db.random_guidance(category) {
            Ok(guidance) => guidance,
            Err(e) => {
                warn!("Failed to read guidance for {}: {}", category, e);
                None
            }
        }
    }
}
