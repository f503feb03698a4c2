//! Maps detection failures to recovery actions and degradation outcomes.
//!
//! This is the only place that decides how a failure is handled; other
//! modules report a [`DetectionErrorKind`] here instead of recovering ad hoc.

use crate::engine::{DiagnosticsSink, ResultCache};
use crate::error::DetectionErrorKind;
use serde::Serialize;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    FallbackToHeuristics,
    ReduceQuality,
    ClearCache,
    UseOfflineMode,
    RestartService,
    SkipDetection,
    UseDefaultSettings,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryAction::FallbackToHeuristics => "fallback_to_heuristics",
            RecoveryAction::ReduceQuality => "reduce_quality",
            RecoveryAction::ClearCache => "clear_cache",
            RecoveryAction::UseOfflineMode => "use_offline_mode",
            RecoveryAction::RestartService => "restart_service",
            RecoveryAction::SkipDetection => "skip_detection",
            RecoveryAction::UseDefaultSettings => "use_default_settings",
        };
        f.write_str(s)
    }
}

/// One action per kind.
pub fn action_for(kind: &DetectionErrorKind) -> RecoveryAction {
    match kind {
        DetectionErrorKind::ModelUnavailable => RecoveryAction::FallbackToHeuristics,
        DetectionErrorKind::ProcessingTimeout => RecoveryAction::ReduceQuality,
        DetectionErrorKind::InsufficientMemory => RecoveryAction::ClearCache,
        DetectionErrorKind::NetworkError(_) => RecoveryAction::UseOfflineMode,
        DetectionErrorKind::StorageError(_) => RecoveryAction::UseDefaultSettings,
        DetectionErrorKind::ClassificationError(_) => RecoveryAction::FallbackToHeuristics,
        DetectionErrorKind::EnforcementError(_) => RecoveryAction::UseOfflineMode,
        DetectionErrorKind::Unknown(_) => RecoveryAction::RestartService,
    }
}

/// Stateless across calls. Holds only the collaborators it acts on.
#[derive(Clone, Default)]
pub struct RecoveryCoordinator {
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    cache: Option<Arc<ResultCache>>,
}

impl RecoveryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Cache cleared when degrading from memory pressure.
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Chooses the action for `kind` and reports it.
    pub fn handle_error(&self, kind: &DetectionErrorKind) -> RecoveryAction {
        let action = action_for(kind);
        self.report(kind, action, "handle_error");
        action
    }

    /// Applies the degraded behaviour for `kind`. Returns `false` only for
    /// unclassified failures, where the caller should consider a restart.
    pub fn degrade(&self, kind: &DetectionErrorKind) -> bool {
        let action = action_for(kind);
        match action {
            RecoveryAction::ClearCache => {
                if let Some(cache) = &self.cache {
                    let dropped = cache.len();
                    cache.clear();
                    info!("Degrading: cleared {} cached results", dropped);
                }
                true
            }
            RecoveryAction::FallbackToHeuristics => {
                info!("Degrading: classifying with heuristics only");
                true
            }
            RecoveryAction::ReduceQuality => {
                info!("Degrading: reduced detection quality");
                true
            }
            RecoveryAction::UseOfflineMode => {
                info!("Degrading: offline mode");
                true
            }
            RecoveryAction::UseDefaultSettings => {
                info!("Degrading: default settings");
                true
            }
            RecoveryAction::SkipDetection => true,
            RecoveryAction::RestartService => {
                warn!(
                    error = %kind,
                    "Degradation not possible for unclassified failure, restart advised"
                );
                false
            }
        }
    }

    /// Never fails and never blocks.
    pub fn report(&self, kind: &DetectionErrorKind, action: RecoveryAction, context: &str) {
        match &self.diagnostics {
            Some(sink) => {
                let delivered =
                    panic::catch_unwind(AssertUnwindSafe(|| sink.report(kind, action, context)));
                if delivered.is_err() {
                    warn!(target: "diagnostics", "Diagnostics sink panicked while reporting {}", kind);
                }
            }
            None => warn!(
                target: "diagnostics",
                kind = kind.label(),
                %action,
                context,
                "{}",
                kind
            ),
        }
    }
}
