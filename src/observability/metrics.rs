//! Metric recording for the ETL run.
//!
//! Calls go through the `metrics` facade; they are no-ops unless the host
//! process installs a recorder.

use std::fmt;

/// Enum representing all metric names used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Read metrics
    ReadAttempts,
    ReadFailures,
    ReadRows,

    // Enrich metrics
    EnrichLookupSuccess,
    EnrichLookupNotFound,
    EnrichLookupError,
    EnrichLookupDuration,

    // Clean metrics
    CleanValuesDefaulted,

    // Sink metrics
    SinkRowsWritten,
    SinkWriteError,

    // Whole run
    RunDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ReadAttempts => "pokemon_etl_read_attempts_total",
            MetricName::ReadFailures => "pokemon_etl_read_failures_total",
            MetricName::ReadRows => "pokemon_etl_read_rows_total",

            MetricName::EnrichLookupSuccess => "pokemon_etl_enrich_lookup_success_total",
            MetricName::EnrichLookupNotFound => "pokemon_etl_enrich_lookup_not_found_total",
            MetricName::EnrichLookupError => "pokemon_etl_enrich_lookup_error_total",
            MetricName::EnrichLookupDuration => "pokemon_etl_enrich_lookup_duration_seconds",

            MetricName::CleanValuesDefaulted => "pokemon_etl_clean_values_defaulted_total",

            MetricName::SinkRowsWritten => "pokemon_etl_sink_rows_written_total",
            MetricName::SinkWriteError => "pokemon_etl_sink_write_error_total",

            MetricName::RunDuration => "pokemon_etl_run_duration_seconds",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub mod read {
    use super::MetricName;

    pub fn attempt() {
        ::metrics::counter!(MetricName::ReadAttempts.as_str()).increment(1);
    }

    pub fn failure() {
        ::metrics::counter!(MetricName::ReadFailures.as_str()).increment(1);
    }

    pub fn rows(count: usize) {
        ::metrics::counter!(MetricName::ReadRows.as_str()).increment(count as u64);
    }
}

pub mod enrich {
    use super::MetricName;

    pub fn lookup_success() {
        ::metrics::counter!(MetricName::EnrichLookupSuccess.as_str()).increment(1);
    }

    pub fn lookup_not_found() {
        ::metrics::counter!(MetricName::EnrichLookupNotFound.as_str()).increment(1);
    }

    pub fn lookup_error() {
        ::metrics::counter!(MetricName::EnrichLookupError.as_str()).increment(1);
    }

    pub fn lookup_duration(secs: f64) {
        ::metrics::histogram!(MetricName::EnrichLookupDuration.as_str()).record(secs);
    }
}

pub mod clean {
    use super::MetricName;

    pub fn values_defaulted(count: usize) {
        if count > 0 {
            ::metrics::counter!(MetricName::CleanValuesDefaulted.as_str()).increment(count as u64);
        }
    }
}

pub mod sink {
    use super::MetricName;

    pub fn rows_written(table: &str, count: usize) {
        ::metrics::counter!(MetricName::SinkRowsWritten.as_str(), "table" => table.to_string())
            .increment(count as u64);
    }

    pub fn write_error(table: &str) {
        ::metrics::counter!(MetricName::SinkWriteError.as_str(), "table" => table.to_string())
            .increment(1);
    }
}

pub mod run {
    use super::MetricName;

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(secs);
    }
}
