use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parse failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to decode {path} as {encoding}")]
    Decode { path: String, encoding: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row {row} has an empty name")]
    EmptyName { row: usize },

    #[error("Row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "db")]
    #[error("libSQL error: {0}")]
    Libsql(#[from] libsql::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Sink rejected write to '{table}': {message}")]
    Sink { table: String, message: String },

    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl EtlError {
    /// Problems in the source data itself. Retrying cannot change the outcome.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            EtlError::Csv(_)
                | EtlError::Decode { .. }
                | EtlError::MissingColumn(_)
                | EtlError::EmptyName { .. }
                | EtlError::RaggedRow { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
