use super::{create_table_sql, drop_table_sql, insert_sql};
use crate::app::ports::TableSink;
use crate::error::Result;
use crate::types::{CleanTable, Value};
use async_trait::async_trait;
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Real(f) => ToSqlOutput::from(*f),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

/// Embedded, file-backed destination.
pub struct SqliteSink {
    path: PathBuf,
}

impl SqliteSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(conn)
    }
}

/// Drop, recreate and fill `table_name` inside a single transaction.
pub fn replace_table_blocking(
    conn: &mut Connection,
    table_name: &str,
    table: &CleanTable,
) -> Result<usize> {
    let tx = conn.transaction()?;
    tx.execute(&drop_table_sql(table_name), [])?;
    tx.execute(&create_table_sql(table_name, table), [])?;

    let mut written = 0;
    {
        let mut stmt = tx.prepare(&insert_sql(table_name, table))?;
        for row in table.rows() {
            stmt.execute(params_from_iter(row.iter()))?;
            written += 1;
        }
    }
    tx.commit()?;
    Ok(written)
}

#[async_trait]
impl TableSink for SqliteSink {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }

    async fn replace_table(&self, table_name: &str, table: &CleanTable) -> Result<usize> {
        let path = self.path.clone();
        let name = table_name.to_string();
        let table = table.clone();

        let written = tokio::task::spawn_blocking(move || -> Result<usize> {
            let mut conn = Self::open(&path)?;
            replace_table_blocking(&mut conn, &name, &table)
        })
        .await??;

        debug!("Wrote {} rows to {}", written, self.path.display());
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanRecord, ColumnRole, ColumnSpec, NumericColumn};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn table(names: &[&str]) -> CleanTable {
        CleanTable {
            columns: vec![
                ColumnSpec::name_column(),
                ColumnSpec::new("hp", ColumnRole::Numeric(NumericColumn::Hp)),
                ColumnSpec::capture_rate_column(),
                ColumnSpec::sprite_url_column(),
            ],
            records: names
                .iter()
                .enumerate()
                .map(|(i, n)| CleanRecord {
                    name: n.to_string(),
                    capture_rate: 45.0,
                    stats: BTreeMap::from([(NumericColumn::Hp, i as i64 * 10)]),
                    attributes: vec![],
                    sprite_url: if i == 0 { Some(format!("{n}.png")) } else { None },
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn second_write_fully_replaces_first() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("nested").join("pokemon.db");
        let sink = SqliteSink::new(&db);

        assert_eq!(sink.replace_table("pokemon_first_3", &table(&["a", "b", "c"])).await.unwrap(), 3);
        assert_eq!(sink.replace_table("pokemon_first_3", &table(&["x"])).await.unwrap(), 1);

        let conn = Connection::open(&db).unwrap();
        let names: Vec<String> = conn
            .prepare("SELECT name FROM \"pokemon_first_3\"")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(names, vec!["x"]);
    }

    #[tokio::test]
    async fn values_keep_their_types() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("pokemon.db");
        let sink = SqliteSink::new(&db);
        sink.replace_table("t", &table(&["a", "b"])).await.unwrap();

        let conn = Connection::open(&db).unwrap();
        let (hp, rate, sprite): (i64, f64, Option<String>) = conn
            .query_row(
                "SELECT hp, capture_rate, sprite_url FROM t WHERE name = 'b'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(hp, 10);
        assert_eq!(rate, 45.0);
        assert_eq!(sprite, None);
    }

    #[tokio::test]
    async fn unwritable_location_is_an_error() {
        let dir = tempdir().unwrap();
        // A directory cannot be opened as a database file
        let sink = SqliteSink::new(dir.path());
        assert!(sink.replace_table("t", &table(&["a"])).await.is_err());
    }
}
