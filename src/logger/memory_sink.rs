use super::{DecisionLogEntry, DecisionLogSink};
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// Keeps the most recent decisions in a ring buffer. A capacity of zero
/// keeps nothing.
pub struct MemoryLogSink {
    buffer: Arc<RwLock<VecDeque<DecisionLogEntry>>>,
    capacity: usize,
}

impl MemoryLogSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn get_recent(&self) -> Vec<DecisionLogEntry> {
        let buffer = self.buffer.read().unwrap_or_else(|e| e.into_inner());
        buffer.iter().cloned().collect()
    }

    // Lets callers keep reading after the sink is handed to the logger.
    pub fn clone_buffer(&self) -> Arc<RwLock<VecDeque<DecisionLogEntry>>> {
        self.buffer.clone()
    }
}

impl DecisionLogSink for MemoryLogSink {
    fn log(&self, entry: &DecisionLogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry.clone());
    }
}
