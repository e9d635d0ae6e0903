use crate::app::ports::{RunLog, TableSink};
use crate::constants::{STAGE_CLEAN, STAGE_ENRICH, STAGE_READ, STAGE_SINK};
use crate::error::Result;
use crate::pipeline::ingestion::{read_source_async, SourceFormat};
use crate::pipeline::processing::{clean, EnrichStats, SpriteEnricher};
use crate::pipeline::storage::write_table;
use crate::types::{CleanTable, EnrichedTable, RecordLimit, SourceTable};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Common shape of every pipeline stage
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Name used in logs and retry messages
    fn stage_name(&self) -> &'static str;

    async fn execute(&self, input: Self::Input, log: &dyn RunLog) -> Result<Self::Output>;
}

/// Loads the source file. The only stage that can be retried.
pub struct ReadStage {
    pub path: PathBuf,
    pub format: SourceFormat,
}

#[async_trait]
impl Stage for ReadStage {
    type Input = ();
    type Output = SourceTable;

    fn stage_name(&self) -> &'static str {
        STAGE_READ
    }

    async fn execute(&self, _input: (), log: &dyn RunLog) -> Result<SourceTable> {
        read_source_async(&self.path, &self.format, log).await
    }
}

pub struct EnrichStage {
    pub enricher: SpriteEnricher,
}

#[async_trait]
impl Stage for EnrichStage {
    type Input = (Option<SourceTable>, RecordLimit);
    type Output = (Option<EnrichedTable>, EnrichStats);

    fn stage_name(&self) -> &'static str {
        STAGE_ENRICH
    }

    async fn execute(
        &self,
        input: (Option<SourceTable>, RecordLimit),
        log: &dyn RunLog,
    ) -> Result<(Option<EnrichedTable>, EnrichStats)> {
        let (table, limit) = input;
        Ok(self.enricher.enrich_with_stats(table, limit, log).await)
    }
}

pub struct CleanStage;

#[async_trait]
impl Stage for CleanStage {
    type Input = Option<EnrichedTable>;
    type Output = Option<CleanTable>;

    fn stage_name(&self) -> &'static str {
        STAGE_CLEAN
    }

    async fn execute(
        &self,
        table: Option<EnrichedTable>,
        log: &dyn RunLog,
    ) -> Result<Option<CleanTable>> {
        Ok(clean(table, log))
    }
}

pub struct SinkStage {
    pub sink: Arc<dyn TableSink>,
}

#[async_trait]
impl Stage for SinkStage {
    /// Destination table name and the table to store under it
    type Input = (String, Option<CleanTable>);
    type Output = usize;

    fn stage_name(&self) -> &'static str {
        STAGE_SINK
    }

    async fn execute(
        &self,
        input: (String, Option<CleanTable>),
        log: &dyn RunLog,
    ) -> Result<usize> {
        let (table_name, table) = input;
        write_table(self.sink.as_ref(), &table_name, table.as_ref(), log).await
    }
}
