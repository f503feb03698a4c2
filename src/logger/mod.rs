pub mod console_sink;
pub mod memory_sink;
pub mod sqlite_sink;
pub mod types;

pub use self::console_sink::ConsoleLogSink;
pub use self::memory_sink::MemoryLogSink;
pub use self::sqlite_sink::SqliteLogSink;
pub use self::types::{DecisionAction, DecisionLogEntry, DecisionLogSink};

use crate::config::LoggingConfig;
use crate::db::DbClient;
use crate::engine::DiagnosticsSink;
use crate::error::DetectionErrorKind;
use crate::recovery::RecoveryAction;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, warn};

enum SinkHandle {
    Queued(mpsc::Sender<DecisionLogEntry>),
    // No runtime at construction time; the sink is called on the caller's thread.
    Direct(Box<dyn DecisionLogSink>),
}

/// Fans decision records out to the configured sinks without blocking the caller.
pub struct DecisionLogger {
    sinks: Vec<SinkHandle>,
}

impl DecisionLogger {
    pub fn new(
        config: LoggingConfig,
        extra_sinks: Vec<Box<dyn DecisionLogSink>>,
        db: Option<Arc<DbClient>>,
    ) -> Arc<Self> {
        let mut boxed: Vec<Box<dyn DecisionLogSink>> = Vec::new();

        for sink_type in &config.decision_log_sinks {
            match sink_type.as_str() {
                "console" => boxed.push(Box::new(ConsoleLogSink::new(config.clone()))),
                "sqlite" => match &db {
                    Some(db) => match db.create_log_writer() {
                        Ok(writer) => boxed.push(Box::new(SqliteLogSink::new(writer, &config))),
                        Err(e) => error!("Failed to open SQLite decision writer: {}", e),
                    },
                    None => warn!("SQLite decision sink requested without a database"),
                },
                other => warn!("Unknown log sink type: {}", other),
            }
        }
        boxed.extend(extra_sinks);

        let runtime = tokio::runtime::Handle::try_current().ok();
        let sinks = boxed
            .into_iter()
            .map(|sink| match &runtime {
                Some(handle) => {
                    let (tx, mut rx) = mpsc::channel::<DecisionLogEntry>(1000);
                    handle.spawn(async move {
                        while let Some(entry) = rx.recv().await {
                            sink.log(&entry);
                        }
                    });
                    SinkHandle::Queued(tx)
                }
                None => SinkHandle::Direct(sink),
            })
            .collect();

        Arc::new(Self { sinks })
    }

    pub fn log(&self, entry: DecisionLogEntry) {
        for sink in &self.sinks {
            match sink {
                // Fire and forget, a full buffer drops the record
                SinkHandle::Queued(tx) => {
                    let _ = tx.try_send(entry.clone());
                }
                SinkHandle::Direct(sink) => sink.log(&entry),
            }
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

/// Routes recovery diagnostics into the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, error: &DetectionErrorKind, action: RecoveryAction, context: &str) {
        warn!(
            target: "diagnostics",
            kind = error.label(),
            action = %action,
            context = context,
            "{}",
            error
        );
    }
}
