use super::{create_table_sql, drop_table_sql, insert_sql};
use crate::app::ports::TableSink;
use crate::error::{EtlError, Result};
use crate::types::{CleanTable, Value};
use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Builder, Database};
use tracing::info;

impl From<Value> for libsql::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => libsql::Value::Null,
            Value::Integer(i) => libsql::Value::Integer(i),
            Value::Real(f) => libsql::Value::Real(f),
            Value::Text(s) => libsql::Value::Text(s),
        }
    }
}

/// Remote relational destination (Turso / libSQL server).
pub struct LibsqlSink {
    db: Database,
    url: String,
}

impl LibsqlSink {
    pub async fn connect(url: &str, auth_token: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(EtlError::Config("libSQL URL is empty".to_string()));
        }
        info!("Connecting to libSQL database at {}", url);
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        Ok(Self {
            db,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl TableSink for LibsqlSink {
    fn describe(&self) -> String {
        format!("libsql:{}", self.url)
    }

    async fn replace_table(&self, table_name: &str, table: &CleanTable) -> Result<usize> {
        let conn = self.db.connect()?;
        let tx = conn.transaction().await?;

        tx.execute(&drop_table_sql(table_name), ()).await?;
        tx.execute(&create_table_sql(table_name, table), ()).await?;

        let insert = insert_sql(table_name, table);
        let mut written = 0;
        for row in table.rows() {
            let values: Vec<libsql::Value> = row.into_iter().map(libsql::Value::from).collect();
            tx.execute(&insert, Params::Positional(values)).await?;
            written += 1;
        }

        tx.commit().await?;
        Ok(written)
    }
}
