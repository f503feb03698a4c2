use content_shield::config::{Config, LoggingConfig};
use content_shield::db::DbClient;
use content_shield::engine::{BlockingCategory, DomainHash, MatchTier};
use content_shield::init::build_shield;
use content_shield::logger::{DecisionAction, DecisionLogEntry, DecisionLogger, MemoryLogSink};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_decisions_reach_memory_sink_hashed() {
    let sink = MemoryLogSink::new(16);
    let buffer = sink.clone_buffer();

    let mut config = Config::default();
    config.logging.decision_log_sinks = vec!["console".to_string()];
    let shield = build_shield(&config, None, vec![Box::new(sink)]).unwrap();

    shield.classify("https://PokerNight.example/table");
    shield.classify("https://pokernight.example/table");

    // Allow time for async task to process
    tokio::time::sleep(Duration::from_millis(100)).await;

    let logs = buffer.read().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].domain, DomainHash::of("pokernight.example").to_string());
    assert_eq!(logs[0].action, DecisionAction::Blocked);
    assert_eq!(logs[0].category, Some(BlockingCategory::Gambling));
    assert_eq!(logs[0].tier, MatchTier::Keyword);
    assert!(!logs[0].cached);
    assert!(logs[1].cached);
}

#[tokio::test]
async fn test_raw_domains_when_enabled() {
    let sink = MemoryLogSink::new(4);
    let buffer = sink.clone_buffer();

    let mut config = Config::default();
    config.logging.log_raw_domains = true;
    config.logging.decision_log_sinks = vec![];
    let shield = build_shield(&config, None, vec![Box::new(sink)]).unwrap();

    shield.classify("weather.example");
    tokio::time::sleep(Duration::from_millis(100)).await;

    let logs = buffer.read().unwrap();
    assert_eq!(logs[0].domain, "weather.example");
    assert_eq!(logs[0].action, DecisionAction::Allowed);
}

#[tokio::test]
async fn test_sqlite_sink_logging() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("decisions.db").to_string_lossy().to_string();
    let db = Arc::new(DbClient::new(db_path.clone()).unwrap());
    db.initialize().unwrap();

    let config = LoggingConfig {
        decision_log_sinks: vec!["sqlite".to_string()],
        sqlite_path: db_path,
        sqlite_retention_hours: 24,
        ..LoggingConfig::default()
    };
    let logger = DecisionLogger::new(config, vec![], Some(db.clone()));

    logger.log(DecisionLogEntry {
        domain: DomainHash::of("example.com").to_string(),
        action: DecisionAction::FailClosed,
        category: Some(BlockingCategory::SuspiciousContent),
        confidence: 1.0,
        tier: MatchTier::FailClosed,
        cached: false,
        latency_us: 42,
    });

    // Wait for the background writer thread
    tokio::time::sleep(Duration::from_millis(500)).await;

    let logs = db.recent_decisions(10).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, DecisionAction::FailClosed);
    assert_eq!(logs[0].tier, MatchTier::FailClosed);
    assert_eq!(logs[0].category, Some(BlockingCategory::SuspiciousContent));
    assert_eq!(logs[0].latency_us, 42);
}
