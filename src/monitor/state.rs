use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub last_target: Option<String>,
    pub last_event_ts_ms: i64,
    pub is_active: bool,
}

/// Foreground-tracking state owned by the monitor loop. Cloning shares the
/// same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    inner: Arc<RwLock<MonitorSnapshot>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).is_active
    }

    pub fn set_active(&self, active: bool) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        guard.is_active = active;
    }

    /// Records `target` as the new foreground target if it differs from the
    /// last accepted one and, at poll time `now_ms`, at least
    /// `min_interval_ms` passed since the last accepted event. A rejected
    /// switch is picked up by a later poll while the event is still in the
    /// query window. Returns whether the event was accepted.
    pub fn accept(&self, target: &str, timestamp_ms: i64, now_ms: i64, min_interval_ms: u64) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());

        if let Some(last) = &guard.last_target {
            if last == target {
                return false;
            }
            if now_ms.saturating_sub(guard.last_event_ts_ms) < min_interval_ms as i64 {
                return false;
            }
        }

        guard.last_target = Some(target.to_string());
        guard.last_event_ts_ms = timestamp_ms;
        true
    }

    pub fn reset(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = MonitorSnapshot::default();
    }
}
