use crate::engine::{BlockingCategory, ClassificationResult, MatchTier};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DecisionLogEntry {
    pub domain: String, // Hash unless raw domains are enabled
    pub action: DecisionAction,
    pub category: Option<BlockingCategory>,
    pub confidence: f32,
    pub tier: MatchTier,
    pub cached: bool,
    pub latency_us: u64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum DecisionAction {
    Allowed,
    Blocked,
    FailClosed,
}

impl DecisionAction {
    pub fn from_result(result: &ClassificationResult) -> Self {
        match (result.is_blocked, result.tier) {
            (true, MatchTier::FailClosed) => DecisionAction::FailClosed,
            (true, _) => DecisionAction::Blocked,
            (false, _) => DecisionAction::Allowed,
        }
    }
}

pub trait DecisionLogSink: Send + Sync {
    fn log(&self, entry: &DecisionLogEntry);
}
