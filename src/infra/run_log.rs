use crate::app::ports::{LogLevel, RunLog};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Forwards run log entries to `tracing` with the stage as a field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLog;

impl RunLog for TracingRunLog {
    fn record(&self, level: LogLevel, stage: &str, message: &str) {
        match level {
            LogLevel::Info => info!(stage = %stage, "{}", message),
            LogLevel::Warn => warn!(stage = %stage, "{}", message),
            LogLevel::Error => error!(stage = %stage, "{}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub stage: String,
    pub message: String,
}

/// Keeps every entry in memory so tests can assert on what a run reported.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries().iter().filter(|e| e.level == level).count()
    }

    pub fn count_for(&self, stage: &str, level: LogLevel) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.level == level && e.stage == stage)
            .count()
    }
}

impl RunLog for MemoryRunLog {
    fn record(&self, level: LogLevel, stage: &str, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                stage: stage.to_string(),
                message: message.to_string(),
            });
        }
    }
}
