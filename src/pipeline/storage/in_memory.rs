use crate::app::ports::TableSink;
use crate::error::Result;
use crate::types::CleanTable;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory sink for development/testing
#[derive(Clone, Default)]
pub struct InMemorySink {
    tables: Arc<Mutex<HashMap<String, CleanTable>>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> Option<CleanTable> {
        self.tables.lock().ok().and_then(|t| t.get(name).cloned())
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl TableSink for InMemorySink {
    fn describe(&self) -> String {
        "in-memory store".to_string()
    }

    async fn replace_table(&self, table_name: &str, table: &CleanTable) -> Result<usize> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        tables.insert(table_name.to_string(), table.clone());
        debug!("Replaced in-memory table {} with {} rows", table_name, table.len());
        Ok(table.len())
    }
}
