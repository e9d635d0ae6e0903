use async_trait::async_trait;

use crate::error::Result;
use crate::types::CleanTable;

// Lookup-side ports
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    /// `Err` is reserved for transport failures (timeout, DNS, refused).
    async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

#[async_trait]
pub trait RateLimiterPort: Send + Sync {
    /// Wait until the next outbound request is allowed.
    async fn acquire(&self);
}

// Destination port
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Short human-readable locator for logs, never including credentials
    fn describe(&self) -> String;

    /// Drop any existing table named `table_name` and write `table` in its place.
    /// Returns the number of rows written.
    async fn replace_table(&self, table_name: &str, table: &CleanTable) -> Result<usize>;
}

// Run log port, handed to every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

pub trait RunLog: Send + Sync {
    fn record(&self, level: LogLevel, stage: &str, message: &str);

    fn info(&self, stage: &str, message: &str) {
        self.record(LogLevel::Info, stage, message);
    }

    fn warn(&self, stage: &str, message: &str) {
        self.record(LogLevel::Warn, stage, message);
    }

    fn error(&self, stage: &str, message: &str) {
        self.record(LogLevel::Error, stage, message);
    }
}
