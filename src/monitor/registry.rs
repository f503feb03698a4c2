use super::{AppBlockRegistry, EnforcementMethod};
use chrono::{Datelike, Duration, Local, NaiveDateTime, NaiveTime, Weekday};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// A recurring time-of-day window during which a blocked target is enforced.
///
/// Both boundary seconds are inside the window. A window whose `start` is
/// after its `end` wraps midnight and belongs to the day it starts on. An
/// empty `days` list means every day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    #[serde(default)]
    pub days: Vec<Weekday>,
}

impl ScheduleWindow {
    pub fn daily(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            days: Vec::new(),
        }
    }

    pub fn on(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days = days.into_iter().collect();
        self
    }

    fn runs_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let time = at.time();
        let today = at.weekday();

        if self.start <= self.end {
            return self.runs_on(today) && time >= self.start && time <= self.end;
        }

        // Wraps midnight
        if time >= self.start {
            self.runs_on(today)
        } else if time <= self.end {
            let yesterday = (at - Duration::days(1)).weekday();
            self.runs_on(yesterday)
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppRule {
    pub method: EnforcementMethod,
    pub schedules: Vec<ScheduleWindow>,
}

impl AppRule {
    pub fn always(method: EnforcementMethod) -> Self {
        Self {
            method,
            schedules: Vec::new(),
        }
    }

    pub fn scheduled(method: EnforcementMethod, schedules: Vec<ScheduleWindow>) -> Self {
        Self { method, schedules }
    }
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// In-memory app-blocking registry with per-target schedules.
///
/// `enforce` only records the request; the actual blocking surface lives
/// outside this crate.
pub struct MemoryAppRegistry {
    rules: RwLock<FxHashMap<String, AppRule>>,
    block_counts: RwLock<FxHashMap<String, u64>>,
    enforced: RwLock<Vec<(String, EnforcementMethod)>>,
    clock: Clock,
}

impl Default for MemoryAppRegistry {
    fn default() -> Self {
        Self {
            rules: RwLock::new(FxHashMap::default()),
            block_counts: RwLock::new(FxHashMap::default()),
            enforced: RwLock::new(Vec::new()),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }
}

impl MemoryAppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn block(&self, target: &str, rule: AppRule) {
        let mut rules = self.rules.write().unwrap_or_else(|e| e.into_inner());
        rules.insert(target.to_string(), rule);
    }

    pub fn unblock(&self, target: &str) -> bool {
        let mut rules = self.rules.write().unwrap_or_else(|e| e.into_inner());
        rules.remove(target).is_some()
    }

    pub fn block_count(&self, target: &str) -> u64 {
        let counts = self.block_counts.read().unwrap_or_else(|e| e.into_inner());
        counts.get(target).copied().unwrap_or(0)
    }

    pub fn enforced(&self) -> Vec<(String, EnforcementMethod)> {
        self.enforced
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn rule(&self, target: &str) -> Option<AppRule> {
        let rules = self.rules.read().unwrap_or_else(|e| e.into_inner());
        rules.get(target).cloned()
    }
}

impl AppBlockRegistry for MemoryAppRegistry {
    fn is_blocked(&self, target: &str) -> bool {
        self.rule(target).is_some()
    }

    fn has_schedule(&self, target: &str) -> bool {
        self.rule(target).is_some_and(|r| !r.schedules.is_empty())
    }

    fn is_within_active_schedule_window(&self, target: &str) -> bool {
        let now = (self.clock)();
        self.rule(target)
            .is_some_and(|r| r.schedules.iter().any(|w| w.contains(now)))
    }

    fn recommended_enforcement_method(&self, target: &str) -> EnforcementMethod {
        self.rule(target)
            .map(|r| r.method)
            .unwrap_or(EnforcementMethod::Overlay)
    }

    fn enforce(&self, target: &str, method: EnforcementMethod) -> Result<(), String> {
        debug!("Enforcing {:?} on {}", method, target);
        let mut enforced = self.enforced.write().unwrap_or_else(|e| e.into_inner());
        enforced.push((target.to_string(), method));
        Ok(())
    }

    fn increment_block_count(&self, target: &str) {
        let mut counts = self.block_counts.write().unwrap_or_else(|e| e.into_inner());
        *counts.entry(target.to_string()).or_insert(0) += 1;
    }
}
