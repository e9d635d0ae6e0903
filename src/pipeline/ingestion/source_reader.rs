use crate::app::ports::RunLog;
use crate::constants::{
    ALTERNATE_NAME_COLUMN, DEFAULT_SOURCE_DELIMITER, NAME_COLUMN, STAGE_READ,
};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use crate::types::{SourceRecord, SourceTable};
use csv::ReaderBuilder;
use encoding_rs::{Encoding, UTF_16LE};
use std::path::Path;

/// Text encoding and field delimiter of the source file.
#[derive(Debug, Clone, Copy)]
pub struct SourceFormat {
    pub encoding: &'static Encoding,
    pub delimiter: u8,
}

impl Default for SourceFormat {
    fn default() -> Self {
        Self {
            encoding: UTF_16LE,
            delimiter: DEFAULT_SOURCE_DELIMITER as u8,
        }
    }
}

impl SourceFormat {
    /// Build from a WHATWG encoding label ("utf-16", "utf-8", ...) and a single ASCII delimiter.
    pub fn from_labels(encoding: &str, delimiter: char) -> Result<Self> {
        let encoding = Encoding::for_label(encoding.trim().as_bytes())
            .ok_or_else(|| EtlError::Config(format!("Unknown source encoding '{encoding}'")))?;
        if !delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "Source delimiter must be a single ASCII character, got {delimiter:?}"
            )));
        }
        Ok(Self {
            encoding,
            delimiter: delimiter as u8,
        })
    }

    pub fn describe(&self) -> String {
        format!("{} / {:?}", self.encoding.name(), self.delimiter as char)
    }
}

/// Trim and lowercase a header cell.
pub fn normalize_column(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized header, or `unnamed: <idx>` for a blank header cell.
fn header_name(idx: usize, raw: &str) -> String {
    let name = normalize_column(raw);
    if name.is_empty() {
        format!("unnamed: {idx}")
    } else {
        name
    }
}

/// Decode raw bytes. A byte order mark overrides the configured encoding.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding, origin: &str) -> Result<String> {
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(EtlError::Decode {
            path: origin.to_string(),
            encoding: used.name().to_string(),
        });
    }
    Ok(text.into_owned())
}

/// Parse already-decoded delimited text into a [`SourceTable`].
pub fn parse_table(text: &str, delimiter: u8) -> Result<SourceTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut columns: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(idx, raw)| header_name(idx, raw))
        .collect();

    // Only rename when it cannot collide with an existing canonical column
    if !columns.iter().any(|c| c == NAME_COLUMN) {
        if let Some(alt) = columns.iter_mut().find(|c| *c == ALTERNATE_NAME_COLUMN) {
            *alt = NAME_COLUMN.to_string();
        }
    }

    let name_idx = columns
        .iter()
        .position(|c| c == NAME_COLUMN)
        .ok_or_else(|| EtlError::MissingColumn(NAME_COLUMN.to_string()))?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        // Short rows are padded with missing cells; long rows cannot be placed
        if row.len() > columns.len() {
            return Err(EtlError::RaggedRow {
                row: i + 1,
                expected: columns.len(),
                found: row.len(),
            });
        }
        let mut values: Vec<Option<String>> = row
            .iter()
            .map(|cell| {
                if cell.is_empty() {
                    None
                } else {
                    Some(cell.to_string())
                }
            })
            .collect();
        values.resize(columns.len(), None);

        let name = values
            .get(name_idx)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(EtlError::EmptyName { row: i + 1 })?
            .to_string();

        records.push(SourceRecord { name, values });
    }

    Ok(SourceTable { columns, records })
}

/// Read, decode and parse without logging. Blocking.
pub fn load_source(path: &Path, format: &SourceFormat) -> Result<SourceTable> {
    let bytes = std::fs::read(path)?;
    let text = decode_text(&bytes, format.encoding, &path.display().to_string())?;
    parse_table(&text, format.delimiter)
}

fn log_read_start(path: &Path, format: &SourceFormat, log: &dyn RunLog) {
    log.info(
        STAGE_READ,
        &format!("Reading source '{}' ({})", path.display(), format.describe()),
    );
    metrics::read::attempt();
}

fn report_read(result: Result<SourceTable>, log: &dyn RunLog) -> Result<SourceTable> {
    match result {
        Ok(table) => {
            log.info(
                STAGE_READ,
                &format!(
                    "Read {} records with {} normalized columns",
                    table.len(),
                    table.columns.len()
                ),
            );
            metrics::read::rows(table.len());
            Ok(table)
        }
        Err(e) => {
            log.error(STAGE_READ, &format!("Failed to read or prepare source: {e}"));
            metrics::read::failure();
            Err(e)
        }
    }
}

/// Read the source file into a table. Every failure is returned to the caller.
pub fn read_source(path: &Path, format: &SourceFormat, log: &dyn RunLog) -> Result<SourceTable> {
    log_read_start(path, format, log);
    report_read(load_source(path, format), log)
}

/// [`read_source`] with the file I/O and parsing moved off the async runtime.
pub async fn read_source_async(
    path: &Path,
    format: &SourceFormat,
    log: &dyn RunLog,
) -> Result<SourceTable> {
    log_read_start(path, format, log);
    let owned_path = path.to_path_buf();
    let format = *format;
    let result = tokio::task::spawn_blocking(move || load_source(&owned_path, &format))
        .await
        .map_err(EtlError::from)
        .and_then(|r| r);
    report_read(result, log)
}
