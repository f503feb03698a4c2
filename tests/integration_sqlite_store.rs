use content_shield::config::{Config, StoreBackend};
use content_shield::db::DbClient;
use content_shield::engine::{
    BlockingCategory, BlocklistStore, DomainHash, FalsePositiveSink, Guidance, GuidanceStore,
    MatchTier, SiteEntry,
};
use content_shield::init::{build_shield, init_database};
use content_shield::store::SqliteStore;
use std::sync::Arc;

fn open_store(dir: &tempfile::TempDir) -> (Arc<DbClient>, SqliteStore) {
    let path = dir.path().join("shield.db");
    let db = Arc::new(DbClient::new(path.to_string_lossy().to_string()).unwrap());
    db.initialize().unwrap();
    (db.clone(), SqliteStore::new(db))
}

#[test]
fn test_sqlite_store_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, store) = open_store(&dir);

    store
        .insert(SiteEntry::curated("roulette.example", BlockingCategory::Gambling))
        .unwrap();
    store
        .insert(SiteEntry::curated("*.chat.example", BlockingCategory::DatingSites).with_confidence(0.8))
        .unwrap();
    store
        .insert(SiteEntry::regex(r"/explicit/\d+", BlockingCategory::ExplicitContent, 0.7))
        .unwrap();

    let exact = store
        .lookup_by_hash(&DomainHash::of("Roulette.example "))
        .unwrap()
        .unwrap();
    assert_eq!(exact.category, BlockingCategory::Gambling);
    assert_eq!(exact.confidence, 1.0);

    let patterns = store.lookup_by_pattern_substring("eu.chat.example").unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].pattern, "*.chat.example");
    assert!(!patterns[0].is_regex);

    let regexes = store.lookup_regex_entries().unwrap();
    assert_eq!(regexes.len(), 1);
    assert!(regexes[0].is_regex);
}

#[test]
fn test_sqlite_deactivate_and_counts() {
    let dir = tempfile::tempdir().unwrap();
    let (_db, store) = open_store(&dir);

    store
        .insert(SiteEntry::user("mine.example", BlockingCategory::AdultEntertainment))
        .unwrap();
    store
        .insert(SiteEntry::curated("theirs.example", BlockingCategory::Gambling))
        .unwrap();
    assert_eq!(store.count_user_added().unwrap(), 1);

    let hash = DomainHash::of("mine.example");
    assert!(store.deactivate(&hash).unwrap());
    assert!(!store.deactivate(&hash).unwrap());
    assert!(store.lookup_by_hash(&hash).unwrap().is_none());
    assert_eq!(store.count_user_added().unwrap(), 0);

    let found = store.search_by_query("gambling").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pattern, "theirs.example");
}

#[test]
fn test_sqlite_reports_and_guidance() {
    let dir = tempfile::tempdir().unwrap();
    let (db, store) = open_store(&dir);

    let hash = DomainHash::of("library.example");
    store
        .record_report(&hash, "https://library.example/", "public library", 1_700_000_000)
        .unwrap();
    let reports = db.reports_for(&hash).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].reason, "public library");

    assert!(store.random_guidance_for(BlockingCategory::Gambling).is_none());
    db.insert_guidance(&Guidance {
        category: BlockingCategory::Gambling,
        locale: "en".to_string(),
        text: "Call the helpline.".to_string(),
        reference: "guidance/gambling".to_string(),
    })
    .unwrap();
    let guidance = store.random_guidance_for(BlockingCategory::Gambling).unwrap();
    assert_eq!(guidance.text, "Call the helpline.");
}

#[test]
fn test_initialize_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (db, store) = open_store(&dir);
    store
        .insert(SiteEntry::curated("keep.example", BlockingCategory::Gambling))
        .unwrap();

    db.initialize().unwrap();
    assert!(store
        .lookup_by_hash(&DomainHash::of("keep.example"))
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_shield_over_sqlite_backend() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.store.backend = StoreBackend::Sqlite;
    config.store.sqlite_path = dir.path().join("shield.db").to_string_lossy().to_string();
    config.logging.decision_log_sinks = vec![];

    let db = init_database(&config).unwrap();
    assert!(db.is_some());
    let shield = build_shield(&config, db, Vec::new()).unwrap();

    assert!(!shield.is_blocked("quiet.example"));
    assert!(shield.add_custom_entry("quiet.example", BlockingCategory::DatingSites));
    let result = shield.classify("https://quiet.example/profile");
    assert!(result.is_blocked);
    assert_eq!(result.tier, MatchTier::ExactHash);
    assert_eq!(shield.count_user_added(), 1);

    let decision = shield.decide("quiet.example");
    let guidance = decision.guidance.unwrap();
    assert_eq!(guidance.category, BlockingCategory::DatingSites);
    assert_eq!(guidance.reference, "guidance/dating-sites");

    assert!(shield.report_false_positive("quiet.example", "mistake"));
    assert_eq!(shield.stats().false_positive_reports, 1);
}
