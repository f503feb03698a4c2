use crate::engine::{
    BlocklistStore, DomainHash, FalsePositiveReport, FalsePositiveSink, SiteEntry, StoreResult,
};
use crate::error::StoreError;
use rustc_hash::FxHashMap;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// In-process block-list, used when no database is configured and in tests.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<FxHashMap<DomainHash, SiteEntry>>,
    reports: RwLock<Vec<FalsePositiveReport>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            reports: RwLock::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = SiteEntry>) -> Self {
        let store = Self::default();
        {
            let mut map = store.entries.write().unwrap_or_else(|e| e.into_inner());
            for entry in entries {
                map.insert(entry.domain_hash.clone(), entry);
            }
        }
        store
    }

    /// Simulates the backing storage going away. Lookups then fail with
    /// `StoreError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reports(&self) -> Vec<FalsePositiveReport> {
        self.reports
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }

    fn collect_sorted(&self, keep: impl Fn(&SiteEntry) -> bool) -> Vec<SiteEntry> {
        let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut found: Vec<SiteEntry> = map.values().filter(|e| keep(e)).cloned().collect();
        found.sort_by(by_confidence_then_pattern);
        found
    }
}

// Same ordering as the sqlite queries so both backends agree on first match.
fn by_confidence_then_pattern(a: &SiteEntry, b: &SiteEntry) -> CmpOrdering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(CmpOrdering::Equal)
        .then_with(|| a.pattern.cmp(&b.pattern))
}

impl BlocklistStore for MemoryStore {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Relaxed)
    }

    fn lookup_by_hash(&self, hash: &DomainHash) -> StoreResult<Option<SiteEntry>> {
        self.ensure_available()?;
        let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(map.get(hash).filter(|e| e.is_active).cloned())
    }

    fn lookup_by_pattern_substring(&self, fragment: &str) -> StoreResult<Vec<SiteEntry>> {
        self.ensure_available()?;
        let fragment = fragment.to_lowercase();
        Ok(self.collect_sorted(|e| {
            if !e.is_active || e.is_regex {
                return false;
            }
            let pattern = e.pattern.trim_start_matches("*.");
            !pattern.is_empty() && (fragment.contains(pattern) || e.pattern.contains(&fragment))
        }))
    }

    fn lookup_regex_entries(&self) -> StoreResult<Vec<SiteEntry>> {
        self.ensure_available()?;
        Ok(self.collect_sorted(|e| e.is_active && e.is_regex))
    }

    fn insert(&self, entry: SiteEntry) -> StoreResult<()> {
        self.ensure_available()?;
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        map.insert(entry.domain_hash.clone(), entry);
        Ok(())
    }

    fn deactivate(&self, hash: &DomainHash) -> StoreResult<bool> {
        self.ensure_available()?;
        let mut map = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match map.get_mut(hash) {
            Some(entry) if entry.is_active => {
                entry.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn count_user_added(&self) -> StoreResult<u64> {
        self.ensure_available()?;
        let map = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(map
            .values()
            .filter(|e| e.added_by_user && e.is_active)
            .count() as u64)
    }

    fn search_by_query(&self, query: &str) -> StoreResult<Vec<SiteEntry>> {
        self.ensure_available()?;
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let hash = DomainHash::of(&query);
        let mut found = self.collect_sorted(|e| {
            e.is_active
                && (e.pattern.contains(&query)
                    || e.category.as_str().eq_ignore_ascii_case(&query)
                    || e.domain_hash == hash)
        });
        found.sort_by(|a, b| a.pattern.cmp(&b.pattern));
        found.truncate(100);
        Ok(found)
    }
}

impl FalsePositiveSink for MemoryStore {
    fn record_report(
        &self,
        url_hash: &DomainHash,
        original_url: &str,
        reason: &str,
        timestamp: i64,
    ) -> StoreResult<()> {
        self.ensure_available()?;
        let mut reports = self.reports.write().unwrap_or_else(|e| e.into_inner());
        reports.push(FalsePositiveReport {
            url_hash: url_hash.clone(),
            original_url: original_url.to_string(),
            reason: reason.to_string(),
            reported_at: timestamp,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BlockingCategory;

    fn seeded() -> MemoryStore {
        MemoryStore::with_entries(vec![
            SiteEntry::curated("casino.example", BlockingCategory::Gambling),
            SiteEntry::curated("*.dating.example", BlockingCategory::DatingSites).with_confidence(0.8),
            SiteEntry::regex(r"/adult/\d+", BlockingCategory::AdultEntertainment, 0.7),
            SiteEntry::user("mine.example", BlockingCategory::ExplicitContent),
        ])
    }

    #[test]
    fn test_lookup_by_hash_ignores_inactive() {
        let store = seeded();
        let hash = DomainHash::of("casino.example");
        assert!(store.lookup_by_hash(&hash).unwrap().is_some());

        assert!(store.deactivate(&hash).unwrap());
        assert!(store.lookup_by_hash(&hash).unwrap().is_none());
        // Second deactivation is a no-op
        assert!(!store.deactivate(&hash).unwrap());
    }

    #[test]
    fn test_pattern_substring_both_directions() {
        let store = seeded();
        let found = store.lookup_by_pattern_substring("m.dating.example").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, BlockingCategory::DatingSites);

        let found = store.lookup_by_pattern_substring("casino").unwrap();
        assert_eq!(found[0].pattern, "casino.example");

        assert!(store.lookup_regex_entries().unwrap().iter().all(|e| e.is_regex));
    }

    #[test]
    fn test_unavailable_store_errors() {
        let store = seeded();
        store.set_available(false);
        assert!(!store.is_available());
        assert!(matches!(
            store.lookup_by_hash(&DomainHash::of("casino.example")),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn test_count_and_search() {
        let store = seeded();
        assert_eq!(store.count_user_added().unwrap(), 1);

        let by_category = store.search_by_query("GAMBLING").unwrap();
        assert_eq!(by_category.len(), 1);
        let by_domain = store.search_by_query("mine.example").unwrap();
        assert_eq!(by_domain[0].source, crate::engine::EntrySource::User);
        assert!(store.search_by_query("  ").unwrap().is_empty());
    }

    #[test]
    fn test_record_report() {
        let store = MemoryStore::new();
        store
            .record_report(&DomainHash::of("a.example"), "https://a.example/", "school site", 42)
            .unwrap();
        let reports = store.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].reported_at, 42);
    }
}
