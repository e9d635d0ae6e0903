use crate::constants::{CAPTURE_RATE_COLUMN, NAME_COLUMN, SPRITE_URL_COLUMN};
use std::collections::BTreeMap;
use std::fmt;

/// Numeric attribute columns the cleaner coerces to integers when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericColumn {
    NationalNumber,
    HeightM,
    WeightKg,
    Hp,
    Attack,
    Defense,
    SpAttack,
    SpDefense,
    Speed,
}

impl NumericColumn {
    pub const ALL: [NumericColumn; 9] = [
        NumericColumn::NationalNumber,
        NumericColumn::HeightM,
        NumericColumn::WeightKg,
        NumericColumn::Hp,
        NumericColumn::Attack,
        NumericColumn::Defense,
        NumericColumn::SpAttack,
        NumericColumn::SpDefense,
        NumericColumn::Speed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NumericColumn::NationalNumber => "national_number",
            NumericColumn::HeightM => "height_m",
            NumericColumn::WeightKg => "weight_kg",
            NumericColumn::Hp => "hp",
            NumericColumn::Attack => "attack",
            NumericColumn::Defense => "defense",
            NumericColumn::SpAttack => "sp_attack",
            NumericColumn::SpDefense => "sp_defense",
            NumericColumn::Speed => "speed",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for NumericColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row as read from the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    /// Display name, never empty
    pub name: String,
    /// Raw cells aligned with the owning table's columns; `None` for empty cells
    pub values: Vec<Option<String>>,
}

impl SourceRecord {
    /// Key used against the lookup service
    pub fn lookup_key(&self) -> String {
        self.name.to_lowercase()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    /// Normalized (trimmed, lowercased) column names
    pub columns: Vec<String>,
    pub records: Vec<SourceRecord>,
}

impl SourceTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub source: SourceRecord,
    /// `None` when the lookup missed or failed
    pub sprite_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedTable {
    /// Source columns; `sprite_url` is implied on every record
    pub columns: Vec<String>,
    pub records: Vec<EnrichedRecord>,
}

impl EnrichedTable {
    /// Wrap a source table without performing any lookups.
    pub fn unenriched(table: SourceTable) -> Self {
        Self {
            columns: table.columns,
            records: table
                .records
                .into_iter()
                .map(|source| EnrichedRecord {
                    source,
                    sprite_url: None,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How a cleaned column is sourced from a [`CleanRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Name,
    CaptureRate,
    Numeric(NumericColumn),
    /// Passthrough text, index into [`CleanRecord::attributes`]
    Attribute(usize),
    SpriteUrl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }

    pub fn name_column() -> Self {
        Self::new(NAME_COLUMN, ColumnRole::Name)
    }

    pub fn capture_rate_column() -> Self {
        Self::new(CAPTURE_RATE_COLUMN, ColumnRole::CaptureRate)
    }

    pub fn sprite_url_column() -> Self {
        Self::new(SPRITE_URL_COLUMN, ColumnRole::SpriteUrl)
    }

    pub fn kind(&self) -> ColumnType {
        match self.role {
            ColumnRole::CaptureRate => ColumnType::Real,
            ColumnRole::Numeric(_) => ColumnType::Integer,
            ColumnRole::Name | ColumnRole::Attribute(_) | ColumnRole::SpriteUrl => ColumnType::Text,
        }
    }
}

/// A single cell ready for persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub name: String,
    pub capture_rate: f64,
    /// One entry per numeric column present in the table schema
    pub stats: BTreeMap<NumericColumn, i64>,
    pub attributes: Vec<Option<String>>,
    pub sprite_url: Option<String>,
}

impl CleanRecord {
    pub fn stat(&self, column: NumericColumn) -> Option<i64> {
        self.stats.get(&column).copied()
    }

    pub fn value(&self, role: ColumnRole) -> Value {
        match role {
            ColumnRole::Name => Value::Text(self.name.clone()),
            ColumnRole::CaptureRate => Value::Real(self.capture_rate),
            // The cleaner fills every schema column, so a miss here means a foreign role
            ColumnRole::Numeric(col) => self.stat(col).map(Value::Integer).unwrap_or(Value::Null),
            ColumnRole::Attribute(i) => match self.attributes.get(i) {
                Some(Some(text)) => Value::Text(text.clone()),
                _ => Value::Null,
            },
            ColumnRole::SpriteUrl => match &self.sprite_url {
                Some(url) => Value::Text(url.clone()),
                None => Value::Null,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanTable {
    pub columns: Vec<ColumnSpec>,
    pub records: Vec<CleanRecord>,
}

impl CleanTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Cells of every record, aligned with `columns`
    pub fn rows(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        self.records
            .iter()
            .map(move |r| self.columns.iter().map(|c| r.value(c.role)).collect())
    }
}

/// How many source records a run hands to enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLimit {
    All,
    First(usize),
}

impl RecordLimit {
    pub fn apply(&self, available: usize) -> usize {
        match self {
            RecordLimit::All => available,
            RecordLimit::First(n) => (*n).min(available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_column_names_round_trip() {
        for col in NumericColumn::ALL {
            assert_eq!(NumericColumn::from_column(col.as_str()), Some(col));
        }
        assert_eq!(NumericColumn::from_column("capture_rate"), None);
    }

    #[test]
    fn record_limit_caps_at_available() {
        assert_eq!(RecordLimit::First(5).apply(3), 3);
        assert_eq!(RecordLimit::First(2).apply(3), 2);
        assert_eq!(RecordLimit::All.apply(3), 3);
    }

    #[test]
    fn clean_table_rows_follow_column_order() {
        let table = CleanTable {
            columns: vec![
                ColumnSpec::new("national_number", ColumnRole::Numeric(NumericColumn::NationalNumber)),
                ColumnSpec::name_column(),
                ColumnSpec::new("gen", ColumnRole::Attribute(0)),
                ColumnSpec::capture_rate_column(),
                ColumnSpec::sprite_url_column(),
            ],
            records: vec![CleanRecord {
                name: "Bulbasaur".to_string(),
                capture_rate: 45.0,
                stats: BTreeMap::from([(NumericColumn::NationalNumber, 1)]),
                attributes: vec![None],
                sprite_url: Some("https://img/1.png".to_string()),
            }],
        };

        let rows: Vec<Vec<Value>> = table.rows().collect();
        assert_eq!(
            rows[0],
            vec![
                Value::Integer(1),
                Value::Text("Bulbasaur".to_string()),
                Value::Null,
                Value::Real(45.0),
                Value::Text("https://img/1.png".to_string()),
            ]
        );
    }
}
