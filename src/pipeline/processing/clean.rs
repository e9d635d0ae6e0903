use crate::app::ports::RunLog;
use crate::constants::{CAPTURE_RATE_COLUMN, NAME_COLUMN, SPRITE_URL_COLUMN, STAGE_CLEAN};
use crate::observability::metrics;
use crate::types::{
    CleanRecord, CleanTable, ColumnRole, ColumnSpec, EnrichedTable, NumericColumn,
};
use std::collections::BTreeMap;

/// Parse a cell as a finite number. Blank, non-numeric and non-finite text yields `None`.
pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Capture rate as a number; anything unparseable becomes 0.
pub fn parse_capture_rate(raw: Option<&str>) -> f64 {
    parse_number(raw).unwrap_or(0.0)
}

/// Integral value of a numeric attribute cell: missing becomes 0, fractions truncate toward zero.
pub fn coerce_integer(raw: Option<&str>) -> i64 {
    // `as` saturates at the i64 bounds
    parse_number(raw).map(|v| v as i64).unwrap_or(0)
}

/// Where each cleaned column reads from in the enriched record.
#[derive(Debug)]
struct CleanPlan {
    columns: Vec<ColumnSpec>,
    capture_rate_src: Option<usize>,
    numeric_src: Vec<(NumericColumn, usize)>,
    attribute_src: Vec<usize>,
}

impl CleanPlan {
    fn for_columns(source_columns: &[String]) -> Self {
        let mut columns = Vec::with_capacity(source_columns.len() + 2);
        let mut capture_rate_src = None;
        let mut numeric_src: Vec<(NumericColumn, usize)> = Vec::new();
        let mut attribute_src = Vec::new();

        for (idx, name) in source_columns.iter().enumerate() {
            if name == NAME_COLUMN {
                if !columns.iter().any(|c: &ColumnSpec| c.role == ColumnRole::Name) {
                    columns.push(ColumnSpec::name_column());
                }
            } else if name == CAPTURE_RATE_COLUMN {
                if capture_rate_src.is_none() {
                    capture_rate_src = Some(idx);
                    columns.push(ColumnSpec::capture_rate_column());
                }
            } else if name == SPRITE_URL_COLUMN {
                // Replaced by the enrichment result
                continue;
            } else if let Some(col) = NumericColumn::from_column(name) {
                if !numeric_src.iter().any(|(c, _)| *c == col) {
                    numeric_src.push((col, idx));
                    columns.push(ColumnSpec::new(name.clone(), ColumnRole::Numeric(col)));
                }
            } else {
                columns.push(ColumnSpec::new(
                    name.clone(),
                    ColumnRole::Attribute(attribute_src.len()),
                ));
                attribute_src.push(idx);
            }
        }

        if capture_rate_src.is_none() {
            columns.push(ColumnSpec::capture_rate_column());
        }
        columns.push(ColumnSpec::sprite_url_column());

        Self {
            columns,
            capture_rate_src,
            numeric_src,
            attribute_src,
        }
    }
}

fn cell(values: &[Option<String>], idx: usize) -> Option<&str> {
    values.get(idx).and_then(|v| v.as_deref())
}

/// Normalize numeric columns of an enriched table.
///
/// `capture_rate` is always present and numeric afterwards; every known
/// numeric column that exists in the schema holds an integer on every record.
pub fn clean(table: Option<EnrichedTable>, log: &dyn RunLog) -> Option<CleanTable> {
    let table = match table {
        Some(t) if !t.is_empty() => t,
        _ => {
            log.warn(STAGE_CLEAN, "Empty table, skipping cleaning");
            return None;
        }
    };

    log.info(STAGE_CLEAN, &format!("Cleaning {} records", table.len()));

    let plan = CleanPlan::for_columns(&table.columns);
    let skipped: Vec<&str> = NumericColumn::ALL
        .iter()
        .filter(|c| !plan.numeric_src.iter().any(|(p, _)| p == *c))
        .map(|c| c.as_str())
        .collect();
    if !skipped.is_empty() {
        log.info(
            STAGE_CLEAN,
            &format!("Numeric columns not in schema, skipped: {}", skipped.join(", ")),
        );
    }

    let mut defaulted = 0usize;
    let records: Vec<CleanRecord> = table
        .records
        .into_iter()
        .map(|r| {
            let values = &r.source.values;

            let raw_rate = plan.capture_rate_src.and_then(|i| cell(values, i));
            if parse_number(raw_rate).is_none() {
                defaulted += 1;
            }
            let capture_rate = parse_capture_rate(raw_rate);

            let stats: BTreeMap<NumericColumn, i64> = plan
                .numeric_src
                .iter()
                .map(|(col, i)| {
                    let raw = cell(values, *i);
                    if parse_number(raw).is_none() {
                        defaulted += 1;
                    }
                    (*col, coerce_integer(raw))
                })
                .collect();

            let attributes = plan
                .attribute_src
                .iter()
                .map(|i| cell(values, *i).map(str::to_string))
                .collect();

            CleanRecord {
                name: r.source.name,
                capture_rate,
                stats,
                attributes,
                sprite_url: r.sprite_url,
            }
        })
        .collect();

    metrics::clean::values_defaulted(defaulted);
    log.info(
        STAGE_CLEAN,
        &format!(
            "Cleaning finished: {} records, {} missing or non-numeric values set to 0",
            records.len(),
            defaulted
        ),
    );

    Some(CleanTable {
        columns: plan.columns,
        records,
    })
}
