use crate::app::ports::{HttpClientPort, RateLimiterPort, RunLog};
use crate::constants::STAGE_ENRICH;
use crate::observability::metrics;
use crate::types::{EnrichedRecord, EnrichedTable, RecordLimit, SourceTable};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Result of a single lookup against the sprite service.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// 200 response; the sprite may still be absent from the payload
    Found(Option<String>),
    /// Any non-200 status
    NotFound(u16),
    /// Transport failure or an unreadable body
    Failed(String),
}

impl LookupOutcome {
    pub fn into_sprite(self) -> Option<String> {
        match self {
            LookupOutcome::Found(sprite) => sprite,
            LookupOutcome::NotFound(_) | LookupOutcome::Failed(_) => None,
        }
    }
}

/// Per-run lookup tallies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub resolved: usize,
    pub without_sprite: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl EnrichStats {
    pub fn total(&self) -> usize {
        self.resolved + self.without_sprite + self.not_found + self.failed
    }
}

/// Pull `sprites.front_default` out of a lookup payload.
pub fn extract_sprite(body: &Value) -> Option<String> {
    body.get("sprites")?
        .get("front_default")?
        .as_str()
        .map(str::to_string)
}

/// Attaches a sprite URL to each record by querying `{base_url}/{lowercased name}`.
///
/// Lookups run one at a time, spaced by the rate limiter. Every failure is
/// absorbed into a `None` sprite so the run always continues.
pub struct SpriteEnricher {
    http: Arc<dyn HttpClientPort>,
    limiter: Arc<dyn RateLimiterPort>,
    base_url: String,
}

impl SpriteEnricher {
    pub fn new(
        http: Arc<dyn HttpClientPort>,
        limiter: Arc<dyn RateLimiterPort>,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            limiter,
            base_url,
        }
    }

    pub fn lookup_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    pub async fn lookup(&self, key: &str) -> LookupOutcome {
        let started = Instant::now();
        let outcome = match self.http.get(&self.lookup_url(key)).await {
            Ok(resp) if resp.is_success() => match serde_json::from_slice::<Value>(&resp.bytes) {
                Ok(body) => LookupOutcome::Found(extract_sprite(&body)),
                Err(e) => LookupOutcome::Failed(format!("invalid JSON body: {e}")),
            },
            Ok(resp) => LookupOutcome::NotFound(resp.status),
            Err(e) => LookupOutcome::Failed(e),
        };
        metrics::enrich::lookup_duration(started.elapsed().as_secs_f64());
        outcome
    }

    pub async fn enrich(
        &self,
        table: Option<SourceTable>,
        limit: RecordLimit,
        log: &dyn RunLog,
    ) -> Option<EnrichedTable> {
        self.enrich_with_stats(table, limit, log).await.0
    }

    /// Enrich the first `limit` records, in order, one output record per input record.
    pub async fn enrich_with_stats(
        &self,
        table: Option<SourceTable>,
        limit: RecordLimit,
        log: &dyn RunLog,
    ) -> (Option<EnrichedTable>, EnrichStats) {
        let mut stats = EnrichStats::default();

        let table = match table {
            Some(t) if !t.is_empty() => t,
            _ => {
                log.warn(STAGE_ENRICH, "Empty table, skipping enrichment");
                return (None, stats);
            }
        };

        let selected = limit.apply(table.len());
        if selected == 0 {
            log.warn(STAGE_ENRICH, "Record limit selects no records, skipping enrichment");
            return (None, stats);
        }

        log.info(
            STAGE_ENRICH,
            &format!(
                "Enriching {} of {} records from {}",
                selected,
                table.len(),
                self.base_url
            ),
        );

        let SourceTable { columns, records } = table;
        let mut enriched = Vec::with_capacity(selected);

        for record in records.into_iter().take(selected) {
            let key = record.lookup_key();
            self.limiter.acquire().await;

            let outcome = self.lookup(&key).await;
            match &outcome {
                LookupOutcome::Found(Some(_)) => {
                    stats.resolved += 1;
                    metrics::enrich::lookup_success();
                    log.info(STAGE_ENRICH, &format!("Resolved sprite for {key}"));
                }
                LookupOutcome::Found(None) => {
                    stats.without_sprite += 1;
                    metrics::enrich::lookup_success();
                    log.info(STAGE_ENRICH, &format!("No sprite listed for {key}"));
                }
                LookupOutcome::NotFound(status) => {
                    stats.not_found += 1;
                    metrics::enrich::lookup_not_found();
                    log.warn(
                        STAGE_ENRICH,
                        &format!("{key} not found (status {status})"),
                    );
                }
                LookupOutcome::Failed(reason) => {
                    stats.failed += 1;
                    metrics::enrich::lookup_error();
                    log.error(
                        STAGE_ENRICH,
                        &format!("Lookup failed for {key}: {reason}"),
                    );
                }
            }

            enriched.push(EnrichedRecord {
                source: record,
                sprite_url: outcome.into_sprite(),
            });
        }

        log.info(
            STAGE_ENRICH,
            &format!(
                "Enrichment finished: {} resolved, {} without sprite, {} not found, {} failed",
                stats.resolved, stats.without_sprite, stats.not_found, stats.failed
            ),
        );

        (
            Some(EnrichedTable {
                columns,
                records: enriched,
            }),
            stats,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{HttpGetResult, LogLevel};
    use crate::infra::rate_limiter::Unthrottled;
    use crate::infra::run_log::MemoryRunLog;
    use crate::types::SourceRecord;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned responses keyed by URL and records every request.
    struct MockHttp {
        responses: HashMap<String, std::result::Result<HttpGetResult, String>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttp {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn json(mut self, url: &str, body: Value) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(HttpGetResult {
                    status: 200,
                    bytes: serde_json::to_vec(&body).unwrap(),
                }),
            );
            self
        }

        fn status(mut self, url: &str, status: u16) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(HttpGetResult {
                    status,
                    bytes: b"Not Found".to_vec(),
                }),
            );
            self
        }

        fn raw(mut self, url: &str, bytes: &[u8]) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(HttpGetResult {
                    status: 200,
                    bytes: bytes.to_vec(),
                }),
            );
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClientPort for MockHttp {
        async fn get(&self, url: &str) -> std::result::Result<HttpGetResult, String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err("connection refused".to_string()))
        }
    }

    fn table(names: &[&str]) -> SourceTable {
        SourceTable {
            columns: vec!["name".to_string()],
            records: names
                .iter()
                .map(|n| SourceRecord {
                    name: n.to_string(),
                    values: vec![Some(n.to_string())],
                })
                .collect(),
        }
    }

    fn enricher(http: Arc<MockHttp>) -> SpriteEnricher {
        SpriteEnricher::new(http, Arc::new(Unthrottled), "http://lookup.test/pokemon/")
    }

    #[test]
    fn sprite_extraction_tolerates_missing_paths() {
        assert_eq!(
            extract_sprite(&json!({"sprites": {"front_default": "X"}})),
            Some("X".to_string())
        );
        assert_eq!(extract_sprite(&json!({"sprites": {"front_default": null}})), None);
        assert_eq!(extract_sprite(&json!({"sprites": {}})), None);
        assert_eq!(extract_sprite(&json!({"name": "ditto"})), None);
        assert_eq!(extract_sprite(&json!({"sprites": "nope"})), None);
    }

    #[tokio::test]
    async fn found_sprite_is_attached_using_lowercased_key() {
        let http = Arc::new(MockHttp::new().json(
            "http://lookup.test/pokemon/pikachu",
            json!({"sprites": {"front_default": "X"}}),
        ));
        let log = MemoryRunLog::new();

        let out = enricher(http.clone())
            .enrich(Some(table(&["Pikachu"])), RecordLimit::All, &log)
            .await
            .unwrap();

        assert_eq!(out.records[0].sprite_url.as_deref(), Some("X"));
        assert_eq!(out.records[0].source.name, "Pikachu");
        assert_eq!(http.requests(), vec!["http://lookup.test/pokemon/pikachu"]);
    }

    #[tokio::test]
    async fn not_found_yields_null_and_warning() {
        let http = Arc::new(MockHttp::new().status("http://lookup.test/pokemon/missingno", 404));
        let log = MemoryRunLog::new();

        let (out, stats) = enricher(http)
            .enrich_with_stats(Some(table(&["MissingNo"])), RecordLimit::All, &log)
            .await;

        let out = out.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.records[0].sprite_url, None);
        assert_eq!(stats.not_found, 1);
        assert_eq!(log.count_for(STAGE_ENRICH, LogLevel::Warn), 1);
        assert_eq!(log.count_for(STAGE_ENRICH, LogLevel::Error), 0);
    }

    #[tokio::test]
    async fn connection_failures_keep_every_record() {
        let http = Arc::new(MockHttp::new());
        let log = MemoryRunLog::new();

        let (out, stats) = enricher(http.clone())
            .enrich_with_stats(
                Some(table(&["Bulbasaur", "Ivysaur", "Venusaur"])),
                RecordLimit::All,
                &log,
            )
            .await;

        let out = out.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out.records.iter().all(|r| r.sprite_url.is_none()));
        assert_eq!(stats.failed, 3);
        assert_eq!(log.count_for(STAGE_ENRICH, LogLevel::Error), 3);
        assert_eq!(http.requests().len(), 3);
    }

    #[tokio::test]
    async fn invalid_json_body_counts_as_failure() {
        let http = Arc::new(MockHttp::new().raw("http://lookup.test/pokemon/ditto", b"<html>"));
        let log = MemoryRunLog::new();

        let (out, stats) = enricher(http)
            .enrich_with_stats(Some(table(&["Ditto"])), RecordLimit::All, &log)
            .await;

        assert_eq!(out.unwrap().records[0].sprite_url, None);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn limit_truncates_and_preserves_order() {
        let http = Arc::new(
            MockHttp::new()
                .json("http://lookup.test/pokemon/a", json!({"sprites": {"front_default": "1"}}))
                .json("http://lookup.test/pokemon/b", json!({"sprites": {"front_default": "2"}}))
                .json("http://lookup.test/pokemon/c", json!({"sprites": {"front_default": "3"}})),
        );
        let log = MemoryRunLog::new();
        let e = enricher(http.clone());

        for (limit, expected) in [
            (RecordLimit::First(2), vec!["A", "B"]),
            (RecordLimit::First(10), vec!["A", "B", "C"]),
            (RecordLimit::All, vec!["A", "B", "C"]),
        ] {
            let out = e
                .enrich(Some(table(&["A", "B", "C"])), limit, &log)
                .await
                .unwrap();
            let names: Vec<&str> = out.records.iter().map(|r| r.source.name.as_str()).collect();
            assert_eq!(names, expected);
            for (i, r) in out.records.iter().enumerate() {
                assert_eq!(r.sprite_url, Some((i + 1).to_string()));
            }
        }
    }

    #[tokio::test]
    async fn empty_or_absent_input_returns_none() {
        let http = Arc::new(MockHttp::new());
        let log = MemoryRunLog::new();
        let e = enricher(http.clone());

        assert!(e.enrich(None, RecordLimit::All, &log).await.is_none());
        assert!(e
            .enrich(Some(SourceTable::default()), RecordLimit::All, &log)
            .await
            .is_none());
        assert!(e
            .enrich(Some(table(&["A"])), RecordLimit::First(0), &log)
            .await
            .is_none());
        assert!(http.requests().is_empty());
        assert_eq!(log.count_for(STAGE_ENRICH, LogLevel::Warn), 3);
    }
}
