// Destination stores for cleaned tables

pub mod in_memory;
#[cfg(feature = "db")]
pub mod libsql_sink;
pub mod sqlite;

pub use in_memory::InMemorySink;
#[cfg(feature = "db")]
pub use libsql_sink::LibsqlSink;
pub use sqlite::SqliteSink;

use crate::app::ports::{RunLog, TableSink};
use crate::constants::STAGE_SINK;
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::types::CleanTable;

/// Double-quote an SQL identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn validate_table_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(EtlError::Sink {
            table: name.to_string(),
            message: "table name must be non-empty and free of NUL bytes".to_string(),
        });
    }
    Ok(())
}

pub fn drop_table_sql(table_name: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(table_name))
}

pub fn create_table_sql(table_name: &str, table: &CleanTable) -> String {
    let cols: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_identifier(&c.name), c.kind().sql_type()))
        .collect();
    format!(
        "CREATE TABLE {} ({})",
        quote_identifier(table_name),
        cols.join(", ")
    )
}

pub fn insert_sql(table_name: &str, table: &CleanTable) -> String {
    let names: Vec<String> = table
        .columns
        .iter()
        .map(|c| quote_identifier(&c.name))
        .collect();
    let placeholders: Vec<String> = (1..=table.columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table_name),
        names.join(", "),
        placeholders.join(", ")
    )
}

/// Persist `table` under `table_name`, replacing prior contents.
///
/// Empty or absent input is a logged no-op that returns 0. Store failures are
/// logged and returned.
pub async fn write_table(
    sink: &dyn TableSink,
    table_name: &str,
    table: Option<&CleanTable>,
    log: &dyn RunLog,
) -> Result<usize> {
    let table = match table {
        Some(t) if !t.is_empty() => t,
        _ => {
            log.warn(STAGE_SINK, "No data to save");
            return Ok(0);
        }
    };

    log.info(
        STAGE_SINK,
        &format!(
            "Saving {} rows to table '{}' in {}",
            table.len(),
            table_name,
            sink.describe()
        ),
    );

    let written = match validate_table_name(table_name) {
        Ok(()) => sink.replace_table(table_name, table).await,
        Err(e) => Err(e),
    };

    match written {
        Ok(rows) => {
            metrics::sink::rows_written(table_name, rows);
            log.info(STAGE_SINK, &format!("Saved {rows} rows to '{table_name}'"));
            Ok(rows)
        }
        Err(e) => {
            metrics::sink::write_error(table_name);
            log.error(STAGE_SINK, &format!("Failed to save '{table_name}': {e}"));
            Err(e)
        }
    }
}
