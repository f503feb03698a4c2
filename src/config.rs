use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enable")]
    pub enable: bool,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_pattern_cache_capacity")]
    pub pattern_cache_capacity: u64,
    #[serde(default = "default_heuristics")]
    pub heuristics: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_store_path")]
    pub sqlite_path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    #[serde(default = "default_min_event_interval_ms")]
    pub min_event_interval_ms: u64,
    #[serde(default = "default_active_poll_ms")]
    pub active_poll_ms: u64,
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_enable")]
    pub enable: bool,
    #[serde(default = "default_log_blocked")]
    pub log_blocked: bool,
    #[serde(default = "default_log_allowed")]
    pub log_allowed: bool,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub log_raw_domains: bool,
    #[serde(default = "default_decision_log_sinks")]
    pub decision_log_sinks: Vec<String>,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_sqlite_retention_hours")]
    pub sqlite_retention_hours: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    #[serde(default = "default_stats_enable")]
    pub enable: bool,
    #[serde(default = "default_log_interval")]
    pub log_interval_seconds: u64,
}

// Defaults
fn default_cache_enable() -> bool {
    true
}
fn default_cache_capacity() -> usize {
    1000
}
fn default_pattern_cache_capacity() -> u64 {
    512
}
fn default_heuristics() -> bool {
    true
}
fn default_store_backend() -> StoreBackend {
    StoreBackend::Memory
}
fn default_store_path() -> String {
    "content-shield.db".to_string()
}
fn default_window_ms() -> u64 {
    2000
}
fn default_min_event_interval_ms() -> u64 {
    500
}
fn default_active_poll_ms() -> u64 {
    1000
}
fn default_idle_poll_ms() -> u64 {
    5000
}
fn default_error_backoff_ms() -> u64 {
    2000
}
fn default_log_enable() -> bool {
    true
}
fn default_log_blocked() -> bool {
    true
}
fn default_log_allowed() -> bool {
    false
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_decision_log_sinks() -> Vec<String> {
    vec!["console".to_string()]
}
fn default_sqlite_path() -> String {
    "content-shield.db".to_string()
}
fn default_sqlite_retention_hours() -> u64 {
    168 // 7 days
}
fn default_stats_enable() -> bool {
    true
}
fn default_log_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable: default_cache_enable(),
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            pattern_cache_capacity: default_pattern_cache_capacity(),
            heuristics: default_heuristics(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            sqlite_path: default_store_path(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            min_event_interval_ms: default_min_event_interval_ms(),
            active_poll_ms: default_active_poll_ms(),
            idle_poll_ms: default_idle_poll_ms(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable: default_log_enable(),
            log_blocked: default_log_blocked(),
            log_allowed: default_log_allowed(),
            format: default_log_format(),
            level: default_log_level(),
            log_raw_domains: false,
            decision_log_sinks: default_decision_log_sinks(),
            sqlite_path: default_sqlite_path(),
            sqlite_retention_hours: default_sqlite_retention_hours(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            enable: default_stats_enable(),
            log_interval_seconds: default_log_interval(),
        }
    }
}

impl Config {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .context("Failed to read config file")?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config TOML")?;
        Ok(config)
    }
}
