use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use content_shield::config::MonitorConfig;
use content_shield::error::ActivityError;
use content_shield::monitor::{
    ActivityEvent, ActivityMonitor, ActivitySource, AppBlockRegistry, AppRule, CycleOutcome,
    EnforcementMethod, EnforcementOutcome, MemoryAppRegistry, MonitorSnapshot, ScheduleWindow,
};
use content_shield::recovery::{RecoveryAction, RecoveryCoordinator};
use content_shield::stats::EngineStats;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// --- Mocks ---

#[derive(Default)]
struct ScriptedSource {
    events: Mutex<Vec<ActivityEvent>>,
    inactive: AtomicBool,
    revoked: AtomicBool,
    failing: AtomicBool,
    queries: AtomicUsize,
}

impl ScriptedSource {
    fn set_events(&self, events: Vec<ActivityEvent>) {
        *self.events.lock().unwrap() = events;
    }
}

impl ActivitySource for ScriptedSource {
    fn query_recent_events(
        &self,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<ActivityEvent>, ActivityError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.revoked.load(Ordering::SeqCst) {
            return Err(ActivityError::PermissionRevoked);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ActivityError::Query("usage stats unavailable".to_string()));
        }
        let events = self.events.lock().unwrap();
        Ok(events
            .iter()
            .filter(|e| e.timestamp_ms >= from_ms && e.timestamp_ms <= to_ms)
            .cloned()
            .collect())
    }

    fn is_host_active(&self) -> bool {
        !self.inactive.load(Ordering::SeqCst)
    }
}

/// Blocks everything and refuses to enforce.
struct BrokenEnforcer;

impl AppBlockRegistry for BrokenEnforcer {
    fn is_blocked(&self, _target: &str) -> bool {
        true
    }
    fn has_schedule(&self, _target: &str) -> bool {
        false
    }
    fn is_within_active_schedule_window(&self, _target: &str) -> bool {
        false
    }
    fn recommended_enforcement_method(&self, _target: &str) -> EnforcementMethod {
        EnforcementMethod::Overlay
    }
    fn enforce(&self, _target: &str, _method: EnforcementMethod) -> Result<(), String> {
        Err("overlay permission missing".to_string())
    }
    fn increment_block_count(&self, _target: &str) {}
}

fn monday_at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn hms(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

fn monitor(source: Arc<ScriptedSource>, registry: Arc<dyn AppBlockRegistry>) -> ActivityMonitor {
    ActivityMonitor::new(
        source,
        registry,
        RecoveryCoordinator::new(),
        MonitorConfig::default(),
    )
}

// --- Cycle behaviour ---

#[test]
fn test_same_target_within_interval_enforced_once() {
    let source = Arc::new(ScriptedSource::default());
    let registry = Arc::new(MemoryAppRegistry::new());
    registry.block("com.casino.slots", AppRule::always(EnforcementMethod::CloseApp));
    let monitor = monitor(source.clone(), registry.clone());

    source.set_events(vec![ActivityEvent::resumed("com.casino.slots", 10_000)]);
    let first = monitor.poll_cycle(10_100);
    assert_eq!(
        first,
        CycleOutcome::Transition {
            target: "com.casino.slots".to_string(),
            enforcement: EnforcementOutcome::Enforced(EnforcementMethod::CloseApp),
        }
    );

    source.set_events(vec![
        ActivityEvent::resumed("com.casino.slots", 10_000),
        ActivityEvent::resumed("com.casino.slots", 10_300),
    ]);
    assert_eq!(monitor.poll_cycle(10_400), CycleOutcome::NoTransition);

    assert_eq!(registry.enforced().len(), 1);
    assert_eq!(registry.block_count("com.casino.slots"), 1);
}

#[test]
fn test_switch_back_after_interval_is_evaluated_again() {
    let source = Arc::new(ScriptedSource::default());
    let registry = Arc::new(MemoryAppRegistry::new());
    registry.block("com.video", AppRule::always(EnforcementMethod::Overlay));
    let monitor = monitor(source.clone(), registry.clone());

    source.set_events(vec![ActivityEvent::resumed("com.video", 1_000)]);
    monitor.poll_cycle(1_000);

    source.set_events(vec![ActivityEvent::resumed("com.launcher", 1_200)]);
    // Too soon after the last accepted event
    assert_eq!(monitor.poll_cycle(1_200), CycleOutcome::NoTransition);

    source.set_events(vec![ActivityEvent::resumed("com.launcher", 1_600)]);
    assert!(matches!(
        monitor.poll_cycle(1_600),
        CycleOutcome::Transition {
            enforcement: EnforcementOutcome::NotBlocked,
            ..
        }
    ));

    source.set_events(vec![ActivityEvent::resumed("com.video", 2_200)]);
    monitor.poll_cycle(2_200);
    assert_eq!(registry.block_count("com.video"), 2);
}

#[test]
fn test_quick_switch_then_staying_is_enforced() {
    let source = Arc::new(ScriptedSource::default());
    let registry = Arc::new(MemoryAppRegistry::new());
    registry.block("com.casino", AppRule::always(EnforcementMethod::Overlay));
    let monitor = monitor(source.clone(), registry.clone());

    source.set_events(vec![ActivityEvent::resumed("com.launcher", 10_000)]);
    monitor.poll_cycle(10_050);

    // Switched 200ms later and never left, so no further resume events
    source.set_events(vec![
        ActivityEvent::resumed("com.launcher", 10_000),
        ActivityEvent::resumed("com.casino", 10_200),
    ]);
    assert_eq!(monitor.poll_cycle(10_250), CycleOutcome::NoTransition);
    assert_eq!(registry.block_count("com.casino"), 0);

    assert_eq!(
        monitor.poll_cycle(11_250),
        CycleOutcome::Transition {
            target: "com.casino".to_string(),
            enforcement: EnforcementOutcome::Enforced(EnforcementMethod::Overlay),
        }
    );
    assert_eq!(monitor.poll_cycle(11_900), CycleOutcome::NoTransition);
    assert_eq!(monitor.poll_cycle(12_150), CycleOutcome::NoTransition);
    assert_eq!(registry.block_count("com.casino"), 1);
    assert_eq!(registry.enforced().len(), 1);
}

#[test]
fn test_latest_resume_event_wins() {
    let source = Arc::new(ScriptedSource::default());
    let registry = Arc::new(MemoryAppRegistry::new());
    let monitor = monitor(source.clone(), registry);

    source.set_events(vec![
        ActivityEvent::resumed("com.b", 4_500),
        ActivityEvent::resumed("com.a", 4_000),
    ]);
    monitor.poll_cycle(5_000);
    assert_eq!(monitor.state().last_target.as_deref(), Some("com.b"));
    assert_eq!(monitor.state().last_event_ts_ms, 4_500);
}

#[test]
fn test_unscheduled_target_always_enforced() {
    let source = Arc::new(ScriptedSource::default());
    let registry = Arc::new(MemoryAppRegistry::new().with_clock(|| monday_at(3, 0, 0)));
    registry.block("com.dating", AppRule::always(EnforcementMethod::NavigateHome));
    let monitor = monitor(source.clone(), registry.clone());

    source.set_events(vec![ActivityEvent::resumed("com.dating", 100)]);
    assert!(matches!(
        monitor.poll_cycle(100),
        CycleOutcome::Transition {
            enforcement: EnforcementOutcome::Enforced(EnforcementMethod::NavigateHome),
            ..
        }
    ));
}

#[test]
fn test_schedule_boundaries_at_exact_seconds() {
    let cases = [
        (monday_at(8, 59, 59), false),
        (monday_at(9, 0, 0), true),
        (monday_at(17, 0, 0), true),
        (monday_at(17, 0, 1), false),
    ];

    for (now, expect_enforced) in cases {
        let source = Arc::new(ScriptedSource::default());
        let registry = Arc::new(MemoryAppRegistry::new().with_clock(move || now));
        registry.block(
            "com.game",
            AppRule::scheduled(
                EnforcementMethod::Overlay,
                vec![ScheduleWindow::daily(hms(9, 0, 0), hms(17, 0, 0))],
            ),
        );
        let monitor = monitor(source.clone(), registry.clone());

        source.set_events(vec![ActivityEvent::resumed("com.game", 100)]);
        let outcome = monitor.poll_cycle(100);
        let expected = if expect_enforced {
            EnforcementOutcome::Enforced(EnforcementMethod::Overlay)
        } else {
            EnforcementOutcome::OutsideSchedule
        };
        assert_eq!(
            outcome,
            CycleOutcome::Transition {
                target: "com.game".to_string(),
                enforcement: expected,
            },
            "at {}",
            now
        );
        assert_eq!(registry.block_count("com.game"), u64::from(expect_enforced));
    }
}

#[test]
fn test_inactive_host_skips_query() {
    let source = Arc::new(ScriptedSource::default());
    source.inactive.store(true, Ordering::SeqCst);
    let monitor = monitor(source.clone(), Arc::new(MemoryAppRegistry::new()));

    assert_eq!(monitor.poll_cycle(1_000), CycleOutcome::HostInactive);
    assert_eq!(source.queries.load(Ordering::SeqCst), 0);
    assert_eq!(monitor.next_delay(), Duration::from_millis(5000));

    source.inactive.store(false, Ordering::SeqCst);
    assert_eq!(monitor.next_delay(), Duration::from_millis(1000));
}

#[test]
fn test_query_failure_goes_through_recovery() {
    let source = Arc::new(ScriptedSource::default());
    source.failing.store(true, Ordering::SeqCst);
    let monitor = monitor(source, Arc::new(MemoryAppRegistry::new()));

    assert_eq!(
        monitor.poll_cycle(1_000),
        CycleOutcome::Failed(RecoveryAction::RestartService)
    );
}

#[test]
fn test_enforcement_failure_is_reported() {
    let source = Arc::new(ScriptedSource::default());
    let stats = EngineStats::new();
    let monitor = monitor(source.clone(), Arc::new(BrokenEnforcer)).with_stats(stats.clone());

    source.set_events(vec![ActivityEvent::resumed("com.any", 50)]);
    assert!(matches!(
        monitor.poll_cycle(50),
        CycleOutcome::Transition {
            enforcement: EnforcementOutcome::Failed(RecoveryAction::UseOfflineMode),
            ..
        }
    ));
    assert_eq!(stats.snapshot().enforcements, 0);
}

#[test]
fn test_revoked_permission_reported_by_cycle() {
    let source = Arc::new(ScriptedSource::default());
    source.revoked.store(true, Ordering::SeqCst);
    let monitor = monitor(source, Arc::new(MemoryAppRegistry::new()));
    assert_eq!(monitor.poll_cycle(1_000), CycleOutcome::PermissionRevoked);
}

// --- Loop lifecycle ---

#[tokio::test]
async fn test_start_is_idempotent_and_stop_resets() {
    let source = Arc::new(ScriptedSource::default());
    let registry = Arc::new(MemoryAppRegistry::new());
    registry.block("com.game", AppRule::always(EnforcementMethod::Overlay));
    let now = chrono::Utc::now().timestamp_millis();
    source.set_events(vec![ActivityEvent::resumed("com.game", now)]);

    let monitor = monitor(source.clone(), registry.clone());
    monitor.start();
    monitor.start();
    assert!(monitor.is_monitoring());

    // One loop, one cycle before the 1s active sleep
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.queries.load(Ordering::SeqCst), 1);
    assert_eq!(registry.enforced().len(), 1);

    tokio::time::timeout(Duration::from_secs(1), monitor.stop())
        .await
        .expect("stop should cancel the sleep promptly");
    assert!(!monitor.is_monitoring());
    assert_eq!(monitor.state(), MonitorSnapshot::default());
}

#[tokio::test]
async fn test_permission_revocation_stops_loop() {
    let source = Arc::new(ScriptedSource::default());
    source.revoked.store(true, Ordering::SeqCst);
    let monitor = monitor(source.clone(), Arc::new(MemoryAppRegistry::new()));

    monitor.start();
    for _ in 0..50 {
        if !monitor.is_monitoring() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(!monitor.is_monitoring());
    assert_eq!(source.queries.load(Ordering::SeqCst), 1);

    // Can be started again once permission is back, and the new loop polls
    source.revoked.store(false, Ordering::SeqCst);
    assert!(monitor.start());
    assert!(monitor.is_monitoring());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.queries.load(Ordering::SeqCst), 2);
    assert!(monitor.is_monitoring());

    // A second start while the new loop runs does not spawn another one
    assert!(monitor.start());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.queries.load(Ordering::SeqCst), 2);
    monitor.stop().await;
    assert!(!monitor.is_monitoring());
}

#[test]
fn test_start_without_runtime_is_refused() {
    let source = Arc::new(ScriptedSource::default());
    let monitor = monitor(source.clone(), Arc::new(MemoryAppRegistry::new()));

    assert!(!monitor.start());
    assert!(!monitor.is_monitoring());
    assert_eq!(source.queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_cycles_keep_loop_alive() {
    let source = Arc::new(ScriptedSource::default());
    source.failing.store(true, Ordering::SeqCst);
    let config = MonitorConfig {
        error_backoff_ms: 10,
        ..MonitorConfig::default()
    };
    let monitor = ActivityMonitor::new(
        source.clone(),
        Arc::new(MemoryAppRegistry::new()),
        RecoveryCoordinator::new(),
        config,
    );

    monitor.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(monitor.is_monitoring());
    assert!(source.queries.load(Ordering::SeqCst) >= 2);
    monitor.stop().await;
}
