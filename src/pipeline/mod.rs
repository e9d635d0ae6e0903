// Data pipeline: ingestion, processing, storage, and the orchestrator that wires them

pub mod ingestion;
pub mod orchestrator;
pub mod processing;
pub mod steps;
pub mod storage;

pub use orchestrator::{EtlPipeline, RetryPolicy, RunParams, RunSummary};
pub use steps::{CleanStage, EnrichStage, ReadStage, SinkStage, Stage};
