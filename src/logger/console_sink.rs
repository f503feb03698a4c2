use crate::config::LoggingConfig;
use crate::logger::types::{DecisionAction, DecisionLogEntry, DecisionLogSink};
use tracing::info;

pub struct ConsoleLogSink {
    config: LoggingConfig,
}

impl ConsoleLogSink {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    fn should_log(&self, entry: &DecisionLogEntry) -> bool {
        if !self.config.enable {
            return false;
        }
        match entry.action {
            DecisionAction::Blocked | DecisionAction::FailClosed => self.config.log_blocked,
            DecisionAction::Allowed => self.config.log_allowed,
        }
    }
}

impl DecisionLogSink for ConsoleLogSink {
    fn log(&self, entry: &DecisionLogEntry) {
        if !self.should_log(entry) {
            return;
        }

        if self.config.format == "json" {
            info!(
                target: "decision",
                domain = %entry.domain,
                action = ?entry.action,
                category = ?entry.category,
                confidence = entry.confidence,
                tier = ?entry.tier,
                cached = entry.cached,
                latency_us = entry.latency_us
            );
        } else {
            let action_str = match entry.action {
                DecisionAction::Allowed => "allowed".to_string(),
                DecisionAction::Blocked => format!(
                    "blocked as {} ({:.2}, {:?})",
                    entry.category.map(|c| c.as_str()).unwrap_or("UNKNOWN"),
                    entry.confidence,
                    entry.tier
                ),
                DecisionAction::FailClosed => "blocked by default after a failure".to_string(),
            };
            let origin = if entry.cached { " from cache" } else { "" };

            info!(
                "{} -> {}{} [{}us]",
                entry.domain, action_str, origin, entry.latency_us
            );
        }
    }
}
