//! Initialization helpers for the application startup.

use crate::config::{Config, StoreBackend};
use crate::db::DbClient;
use crate::engine::{
    BlocklistStore, FalsePositiveSink, GuidanceStore, GuidedBlocker, PatternMatcher, ResultCache,
    StandardBlocker, TieredClassifier,
};
use crate::logger::{DecisionLogSink, DecisionLogger, TracingDiagnostics};
use crate::recovery::RecoveryCoordinator;
use crate::shield::ContentShield;
use crate::stats::EngineStats;
use crate::store::{MemoryStore, SqliteStore, StaticGuidance};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Opens the shared database when the store or a decision sink needs it.
pub fn init_database(config: &Config) -> Result<Option<Arc<DbClient>>> {
    let sqlite_store = config.store.backend == StoreBackend::Sqlite;
    let sqlite_sink = config
        .logging
        .decision_log_sinks
        .iter()
        .any(|s| s == "sqlite");

    if !sqlite_store && !sqlite_sink {
        return Ok(None);
    }

    let path = if sqlite_store {
        config.store.sqlite_path.clone()
    } else {
        config.logging.sqlite_path.clone()
    };

    info!("Opening SQLite database at {}", path);
    let client = DbClient::new(path.clone())
        .with_context(|| format!("Failed to open SQLite database at {}", path))?;
    client
        .initialize()
        .context("Failed to initialize SQLite schema")?;
    Ok(Some(Arc::new(client)))
}

/// Wires store, classifier, logger and stats into a `ContentShield`.
///
/// The activity monitor is not attached here since its host collaborators
/// are platform specific.
pub fn build_shield(
    config: &Config,
    db: Option<Arc<DbClient>>,
    extra_sinks: Vec<Box<dyn DecisionLogSink>>,
) -> Result<ContentShield> {
    let (store, reports, guidance): (
        Arc<dyn BlocklistStore>,
        Arc<dyn FalsePositiveSink>,
        Arc<dyn GuidanceStore>,
    ) = match config.store.backend {
        StoreBackend::Sqlite => {
            let db = db
                .clone()
                .context("SQLite backend selected but no database is open")?;
            let store = Arc::new(SqliteStore::new(db));
            let blocklist: Arc<dyn BlocklistStore> = store.clone();
            let reports: Arc<dyn FalsePositiveSink> = store.clone();
            let guidance: Arc<dyn GuidanceStore> = store;
            (blocklist, reports, guidance)
        }
        StoreBackend::Memory => {
            let store = Arc::new(MemoryStore::new());
            let blocklist: Arc<dyn BlocklistStore> = store.clone();
            let reports: Arc<dyn FalsePositiveSink> = store;
            let guidance: Arc<dyn GuidanceStore> = Arc::new(StaticGuidance::new());
            (blocklist, reports, guidance)
        }
    };
    info!("Using {:?} block-list store", config.store.backend);

    let cache = Arc::new(ResultCache::new(config.cache.capacity));
    let recovery = RecoveryCoordinator::new()
        .with_diagnostics(Arc::new(TracingDiagnostics))
        .with_cache(cache.clone());

    let classifier = TieredClassifier::new(
        Some(store),
        PatternMatcher::new(config.classifier.pattern_cache_capacity),
        cache,
        recovery.clone(),
    )
    .with_cache_enabled(config.cache.enable)
    .with_heuristics(config.classifier.heuristics);

    let stats = EngineStats::new();
    let mut base = StandardBlocker::new(Arc::new(classifier))
        .with_reports(reports)
        .with_stats(stats.clone());

    if config.logging.enable {
        let logger = DecisionLogger::new(config.logging.clone(), extra_sinks, db);
        base = base.with_logger(logger, config.logging.log_raw_domains);
    }

    let blocker = GuidedBlocker::new(base, guidance);
    Ok(ContentShield::new(blocker, recovery, stats))
}
