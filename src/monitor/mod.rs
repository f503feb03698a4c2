pub mod registry;
pub mod state;

pub use self::registry::{AppRule, MemoryAppRegistry, ScheduleWindow};
pub use self::state::{MonitorSnapshot, MonitorState};

use crate::config::MonitorConfig;
use crate::error::{ActivityError, DetectionErrorKind};
use crate::recovery::{RecoveryAction, RecoveryCoordinator};
use crate::stats::EngineStats;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityEventKind {
    Resumed,
    Paused,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub target: String,
    pub kind: ActivityEventKind,
    pub timestamp_ms: i64,
}

impl ActivityEvent {
    pub fn resumed(target: &str, timestamp_ms: i64) -> Self {
        Self {
            target: target.to_string(),
            kind: ActivityEventKind::Resumed,
            timestamp_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMethod {
    Overlay,
    NavigateHome,
    CloseApp,
}

/// Host introspection: recent foreground events and device activity.
pub trait ActivitySource: Send + Sync {
    fn query_recent_events(
        &self,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<ActivityEvent>, ActivityError>;

    /// `false` while the screen is off, the device is idle or in power-save.
    fn is_host_active(&self) -> bool;
}

/// Per-target blocking rules consulted on every foreground transition.
pub trait AppBlockRegistry: Send + Sync {
    fn is_blocked(&self, target: &str) -> bool;
    fn has_schedule(&self, target: &str) -> bool;
    fn is_within_active_schedule_window(&self, target: &str) -> bool;
    fn recommended_enforcement_method(&self, target: &str) -> EnforcementMethod;
    fn enforce(&self, target: &str, method: EnforcementMethod) -> Result<(), String>;
    fn increment_block_count(&self, target: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Stopped,
    Starting,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcementOutcome {
    NotBlocked,
    OutsideSchedule,
    Enforced(EnforcementMethod),
    Failed(RecoveryAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    HostInactive,
    NoTransition,
    Transition {
        target: String,
        enforcement: EnforcementOutcome,
    },
    PermissionRevoked,
    Failed(RecoveryAction),
}

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

struct MonitorCore {
    source: Arc<dyn ActivitySource>,
    registry: Arc<dyn AppBlockRegistry>,
    recovery: RecoveryCoordinator,
    stats: Option<Arc<EngineStats>>,
    config: MonitorConfig,
    state: MonitorState,
    status: RwLock<MonitorStatus>,
    run_handle: Mutex<Option<RunHandle>>,
    clock: Clock,
}

struct RunHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

/// Polls foreground activity and enforces blocks on new transitions.
///
/// At most one loop runs at a time. The loop stops on `stop()` or when the
/// activity permission is revoked; every other cycle failure is reported to
/// the recovery coordinator and retried after a backoff.
pub struct ActivityMonitor {
    core: Arc<MonitorCore>,
}

impl ActivityMonitor {
    pub fn new(
        source: Arc<dyn ActivitySource>,
        registry: Arc<dyn AppBlockRegistry>,
        recovery: RecoveryCoordinator,
        config: MonitorConfig,
    ) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                source,
                registry,
                recovery,
                stats: None,
                config,
                state: MonitorState::new(),
                status: RwLock::new(MonitorStatus::Stopped),
                run_handle: Mutex::new(None),
                clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
            }),
        }
    }

    /// Must be called before the monitor is started.
    pub fn with_stats(mut self, stats: Arc<EngineStats>) -> Self {
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.stats = Some(stats);
        }
        self
    }

    /// Must be called before the monitor is started.
    pub fn with_clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.clock = Arc::new(clock);
        }
        self
    }

    /// Spawns the polling loop on the current tokio runtime. No-op while a
    /// loop is already active.
    ///
    /// Returns whether a loop is running afterwards; `false` when called
    /// outside a tokio runtime.
    pub fn start(&self) -> bool {
        let mut run = self.core.run_handle.lock().unwrap_or_else(|e| e.into_inner());
        if self.core.status() != MonitorStatus::Stopped {
            debug!("Activity monitor already running");
            return true;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Cannot start activity monitor without a tokio runtime: {}", e);
                return false;
            }
        };

        self.core.set_status(MonitorStatus::Starting);
        let token = CancellationToken::new();
        let core = Arc::clone(&self.core);
        let loop_token = token.clone();
        let task = runtime.spawn(async move {
            core.run(loop_token).await;
        });

        *run = Some(RunHandle { token, task });
        info!("Activity monitor started");
        true
    }

    /// Cancels the loop, waits for it to finish and resets the state.
    pub async fn stop(&self) {
        let handle = self.core.run_handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.token.cancel();
            if let Err(e) = handle.task.await {
                warn!("Activity monitor task ended abnormally: {}", e);
            }
        }
        self.core.state.reset();
        self.core.set_status(MonitorStatus::Stopped);
        info!("Activity monitor stopped");
    }

    pub fn is_monitoring(&self) -> bool {
        self.core.status() != MonitorStatus::Stopped
    }

    pub fn status(&self) -> MonitorStatus {
        self.core.status()
    }

    pub fn state(&self) -> MonitorSnapshot {
        self.core.state.snapshot()
    }

    /// Runs one polling cycle at `now_ms` without sleeping.
    pub fn poll_cycle(&self, now_ms: i64) -> CycleOutcome {
        self.core.poll_cycle(now_ms)
    }

    /// Delay before the next cycle, given the current host activity.
    pub fn next_delay(&self) -> Duration {
        self.core.next_delay()
    }
}

impl Drop for ActivityMonitor {
    fn drop(&mut self) {
        let handle = self.core.run_handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            handle.token.cancel();
        }
    }
}

impl MonitorCore {
    fn status(&self) -> MonitorStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: MonitorStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    async fn run(&self, token: CancellationToken) {
        self.set_status(MonitorStatus::Running);

        loop {
            let now = (self.clock)();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.poll_cycle(now)))
                .unwrap_or_else(|_| {
                    let kind = DetectionErrorKind::Unknown("monitor cycle panicked".to_string());
                    CycleOutcome::Failed(self.recovery.handle_error(&kind))
                });

            let delay = match outcome {
                CycleOutcome::PermissionRevoked => {
                    warn!("Activity permission revoked, stopping monitor");
                    self.stop_from_loop();
                    return;
                }
                CycleOutcome::Failed(action) => {
                    debug!("Monitor cycle failed ({}), backing off", action);
                    Duration::from_millis(self.config.error_backoff_ms)
                }
                _ => self.next_delay(),
            };

            tokio::select! {
                // stop() resets the state once this task has finished
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Self-termination path. Status and handle change together under the
    /// `run_handle` lock so a concurrent `start()` sees either a live loop or a
    /// fully stopped one.
    fn stop_from_loop(&self) {
        let mut run = self.run_handle.lock().unwrap_or_else(|e| e.into_inner());
        // Taken already: stop() is waiting on this task and finishes the reset.
        if run.take().is_none() {
            return;
        }
        self.state.reset();
        self.set_status(MonitorStatus::Stopped);
    }

    fn next_delay(&self) -> Duration {
        if self.source.is_host_active() {
            Duration::from_millis(self.config.active_poll_ms)
        } else {
            Duration::from_millis(self.config.idle_poll_ms)
        }
    }

    fn poll_cycle(&self, now_ms: i64) -> CycleOutcome {
        let active = self.source.is_host_active();
        self.state.set_active(active);
        if !active {
            return CycleOutcome::HostInactive;
        }

        let from_ms = now_ms.saturating_sub(self.config.window_ms as i64);
        let events = match self.source.query_recent_events(from_ms, now_ms) {
            Ok(events) => events,
            Err(ActivityError::PermissionRevoked) => return CycleOutcome::PermissionRevoked,
            Err(e) => {
                warn!("Failed to query activity events: {}", e);
                let kind = DetectionErrorKind::from(&e);
                return CycleOutcome::Failed(self.recovery.handle_error(&kind));
            }
        };

        let latest = events
            .into_iter()
            .filter(|e| e.kind == ActivityEventKind::Resumed && !e.target.is_empty())
            .max_by_key(|e| e.timestamp_ms);

        let Some(event) = latest else {
            return CycleOutcome::NoTransition;
        };

        if !self.state.accept(
            &event.target,
            event.timestamp_ms,
            now_ms,
            self.config.min_event_interval_ms,
        ) {
            return CycleOutcome::NoTransition;
        }

        debug!("Foreground transition to {}", event.target);
        let enforcement = self.evaluate_target(&event.target);
        CycleOutcome::Transition {
            target: event.target,
            enforcement,
        }
    }

    fn evaluate_target(&self, target: &str) -> EnforcementOutcome {
        let registry = &self.registry;
        if !registry.is_blocked(target) {
            return EnforcementOutcome::NotBlocked;
        }
        if registry.has_schedule(target) && !registry.is_within_active_schedule_window(target) {
            return EnforcementOutcome::OutsideSchedule;
        }

        registry.increment_block_count(target);
        let method = registry.recommended_enforcement_method(target);
        match registry.enforce(target, method) {
            Ok(()) => {
                if let Some(stats) = &self.stats {
                    stats.inc_enforcements();
                }
                info!("Enforced {:?} on {}", method, target);
                EnforcementOutcome::Enforced(method)
            }
            Err(detail) => {
                let kind = DetectionErrorKind::EnforcementError(detail);
                EnforcementOutcome::Failed(self.recovery.handle_error(&kind))
            }
        }
    }
}
