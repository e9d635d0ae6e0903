use crate::app::ports::RunLog;
use crate::constants::{DEFAULT_READ_RETRIES, DEFAULT_READ_RETRY_DELAY_SECS};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::steps::{CleanStage, EnrichStage, ReadStage, SinkStage, Stage};
use crate::types::RecordLimit;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bounded retry with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one
    pub retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_READ_RETRIES,
            delay: Duration::from_secs(DEFAULT_READ_RETRY_DELAY_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

/// Run `stage` until it succeeds or the policy is exhausted; the last error is returned.
/// Data errors fail immediately since another attempt would read the same bytes.
pub async fn execute_with_retry<S>(
    stage: &S,
    input: S::Input,
    policy: RetryPolicy,
    log: &dyn RunLog,
) -> Result<S::Output>
where
    S: Stage,
    S::Input: Clone,
{
    let attempts = policy.max_attempts();
    let mut attempt = 1;
    loop {
        match stage.execute(input.clone(), log).await {
            Ok(out) => return Ok(out),
            Err(e) if e.is_data_error() => {
                log.error(
                    stage.stage_name(),
                    &format!("Not retrying, source data is invalid: {e}"),
                );
                return Err(e);
            }
            Err(e) if attempt < attempts => {
                log.warn(
                    stage.stage_name(),
                    &format!(
                        "Attempt {attempt}/{attempts} failed: {e}; retrying in {:?}",
                        policy.delay
                    ),
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                log.error(
                    stage.stage_name(),
                    &format!("Giving up after {attempt} attempt(s): {e}"),
                );
                return Err(e);
            }
        }
    }
}

/// Per-run parameters supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    pub limit: RecordLimit,
    pub table_name: String,
}

impl RunParams {
    /// Table name derived from the limit: `<prefix>_first_<N>` or `<prefix>_all`.
    pub fn new(limit: RecordLimit, table_prefix: &str) -> Self {
        Self {
            limit,
            table_name: default_table_name(table_prefix, limit),
        }
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }
}

pub fn default_table_name(prefix: &str, limit: RecordLimit) -> String {
    match limit {
        RecordLimit::First(n) => format!("{prefix}_first_{n}"),
        RecordLimit::All => format!("{prefix}_all"),
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub table_name: String,
    pub rows_read: usize,
    pub rows_selected: usize,
    pub sprites_resolved: usize,
    pub lookups_without_sprite: usize,
    pub lookups_not_found: usize,
    pub lookups_failed: usize,
    pub rows_written: usize,
    pub duration_secs: f64,
}

/// Read → enrich → clean → write, in that order, once per call.
pub struct EtlPipeline {
    read: ReadStage,
    enrich: EnrichStage,
    clean: CleanStage,
    sink: SinkStage,
    read_retry: RetryPolicy,
    log: Arc<dyn RunLog>,
}

impl EtlPipeline {
    pub fn new(
        read: ReadStage,
        enrich: EnrichStage,
        sink: SinkStage,
        read_retry: RetryPolicy,
        log: Arc<dyn RunLog>,
    ) -> Self {
        Self {
            read,
            enrich,
            clean: CleanStage,
            sink,
            read_retry,
            log,
        }
    }

    pub async fn run(&self, params: &RunParams) -> Result<RunSummary> {
        let log = self.log.as_ref();
        let started = Instant::now();
        log.info(
            "pipeline",
            &format!(
                "Starting run: limit {:?}, destination table '{}'",
                params.limit, params.table_name
            ),
        );

        let source = execute_with_retry(&self.read, (), self.read_retry, log).await?;
        let rows_read = source.len();

        let (enriched, stats) = self
            .enrich
            .execute((Some(source), params.limit), log)
            .await?;
        let rows_selected = enriched.as_ref().map_or(0, |t| t.len());

        let cleaned = self.clean.execute(enriched, log).await?;

        let rows_written = self
            .sink
            .execute((params.table_name.clone(), cleaned), log)
            .await?;

        let duration = started.elapsed().as_secs_f64();
        metrics::run::duration(duration);
        log.info(
            "pipeline",
            &format!(
                "Run finished in {:.1}s: {} read, {} enriched, {} written to '{}'",
                duration, rows_read, rows_selected, rows_written, params.table_name
            ),
        );

        Ok(RunSummary {
            table_name: params.table_name.clone(),
            rows_read,
            rows_selected,
            sprites_resolved: stats.resolved,
            lookups_without_sprite: stats.without_sprite,
            lookups_not_found: stats.not_found,
            lookups_failed: stats.failed,
            rows_written,
            duration_secs: duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::LogLevel;
    use crate::error::EtlError;
    use crate::infra::run_log::MemoryRunLog;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails until the given attempt number, then succeeds.
    struct Flaky {
        succeed_on: u32,
        calls: AtomicU32,
    }

    /// Always reports a blank name, counting calls.
    struct BadData {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Stage for BadData {
        type Input = ();
        type Output = ();

        fn stage_name(&self) -> &'static str {
            "bad_data"
        }

        async fn execute(&self, _input: (), _log: &dyn RunLog) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(EtlError::EmptyName { row: 7 })
        }
    }

    #[async_trait]
    impl Stage for Flaky {
        type Input = ();
        type Output = u32;

        fn stage_name(&self) -> &'static str {
            "flaky"
        }

        async fn execute(&self, _input: (), _log: &dyn RunLog) -> Result<u32> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                Ok(n)
            } else {
                Err(EtlError::Config(format!("attempt {n} failed")))
            }
        }
    }

    fn quick(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retry_succeeds_within_budget() {
        let stage = Flaky {
            succeed_on: 3,
            calls: AtomicU32::new(0),
        };
        let log = MemoryRunLog::new();
        let out = execute_with_retry(&stage, (), quick(3), &log).await.unwrap();
        assert_eq!(out, 3);
        assert_eq!(log.count_for("flaky", LogLevel::Warn), 2);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_attempts() {
        let stage = Flaky {
            succeed_on: 10,
            calls: AtomicU32::new(0),
        };
        let log = MemoryRunLog::new();
        let err = execute_with_retry(&stage, (), quick(2), &log).await.unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
        assert_eq!(stage.calls.load(Ordering::SeqCst), 3);
        assert_eq!(log.count_for("flaky", LogLevel::Error), 1);
    }

    #[tokio::test]
    async fn data_errors_are_not_retried() {
        let stage = BadData {
            calls: AtomicU32::new(0),
        };
        let log = MemoryRunLog::new();
        let err = execute_with_retry(&stage, (), quick(3), &log).await.unwrap_err();
        assert!(matches!(err, EtlError::EmptyName { row: 7 }));
        assert_eq!(stage.calls.load(Ordering::SeqCst), 1);
        assert_eq!(log.count_for("bad_data", LogLevel::Warn), 0);
    }

    #[test]
    fn table_names_follow_the_limit() {
        assert_eq!(
            RunParams::new(RecordLimit::First(898), "pokemon").table_name,
            "pokemon_first_898"
        );
        assert_eq!(RunParams::new(RecordLimit::All, "pokemon").table_name, "pokemon_all");
        assert_eq!(
            RunParams::new(RecordLimit::All, "pokemon")
                .with_table_name("pokemon_top_10")
                .table_name,
            "pokemon_top_10"
        );
    }

    #[test]
    fn default_policy_matches_reader_harness() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.delay, Duration::from_secs(10));
        assert_eq!(RetryPolicy::none().max_attempts(), 1);
    }
}
