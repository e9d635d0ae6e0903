use crate::constants::*;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub enrichment: EnrichmentConfig,
    pub retry: RetryConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub path: PathBuf,
    pub encoding: String,
    pub delimiter: char,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SOURCE_PATH),
            encoding: DEFAULT_SOURCE_ENCODING.to_string(),
            delimiter: DEFAULT_SOURCE_DELIMITER,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub base_url: String,
    pub delay_ms: u64,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            base_url: POKEAPI_BASE_URL.to_string(),
            delay_ms: DEFAULT_LOOKUP_DELAY_MS,
            timeout_seconds: DEFAULT_LOOKUP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl EnrichmentConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub retries: u32,
    pub delay_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_READ_RETRIES,
            delay_seconds: DEFAULT_READ_RETRY_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Sqlite,
    Libsql,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    pub sqlite_path: PathBuf,
    pub table_prefix: String,
    /// Normally supplied through `LIBSQL_URL`
    pub libsql_url: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Sqlite,
            sqlite_path: PathBuf::from(DEFAULT_SQLITE_PATH),
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            libsql_url: None,
        }
    }
}

/// Connection details that never live in the config file
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub libsql_url: Option<String>,
    pub libsql_auth_token: Option<String>,
}

impl Config {
    /// Load from `path`. A missing default `config.toml` yields built-in defaults;
    /// an explicitly requested file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !explicit && !path.exists() {
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }

        let content = fs::read_to_string(&path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment wins over the file for destination locators.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("POKEMON_ETL_SQLITE_PATH") {
            if !path.trim().is_empty() {
                self.sink.sqlite_path = PathBuf::from(path);
            }
        }
        if let Ok(url) = env::var("LIBSQL_URL") {
            if !url.trim().is_empty() {
                self.sink.libsql_url = Some(url);
            }
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            libsql_url: self.sink.libsql_url.clone(),
            libsql_auth_token: env::var("LIBSQL_AUTH_TOKEN").ok(),
        }
    }
}

/// Load a dotenv file if present. Returns whether one was loaded.
pub fn load_env_file(path: Option<&Path>) -> bool {
    match path {
        Some(p) => dotenv::from_path(p).is_ok(),
        None => dotenv::dotenv().is_ok(),
    }
}
