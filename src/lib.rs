pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod types;

// Port traits and their adapters
pub mod app;
pub mod infra;

pub use error::{EtlError, Result};
pub use pipeline::{EtlPipeline, RetryPolicy, RunParams, RunSummary};
pub use types::RecordLimit;
