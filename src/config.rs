use serde::Deserialize;
use std::time::Duration;

use crate::scheduler::SchedulerConfig;
use crate::sync_engine::EngineConfig;

/// Env var that overrides `api.token` (keeps the credential out of the config file).
pub const TOKEN_ENV: &str = "FLEETDASH_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer credential attached to every request.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_inventory_interval_ms")]
    pub inventory_interval_ms: u64,
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,
}

fn default_inventory_interval_ms() -> u64 {
    8_000
}

fn default_metrics_interval_ms() -> u64 {
    3_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            inventory_interval_ms: default_inventory_interval_ms(),
            metrics_interval_ms: default_metrics_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Samples kept per unit (FIFO).
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

fn default_history_capacity() -> usize {
    crate::metric_buffer::DEFAULT_HISTORY_CAPACITY
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Max number of engine events buffered for /ws/events (slow clients may lag).
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    64
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log engine stats at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config = Self::load_from_str(&s)?;
        if let Ok(token) = std::env::var(TOKEN_ENV)
            && !token.is_empty()
        {
            config.api.token = Some(token);
        }
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow::anyhow!("api.base_url is not a valid URL: {}", e))?;
        anyhow::ensure!(
            matches!(url.scheme(), "http" | "https"),
            "api.base_url must use http or https, got {}",
            url.scheme()
        );
        anyhow::ensure!(
            self.api.request_timeout_ms > 0,
            "api.request_timeout_ms must be > 0, got {}",
            self.api.request_timeout_ms
        );
        anyhow::ensure!(
            self.polling.inventory_interval_ms > 0,
            "polling.inventory_interval_ms must be > 0, got {}",
            self.polling.inventory_interval_ms
        );
        anyhow::ensure!(
            self.polling.metrics_interval_ms > 0,
            "polling.metrics_interval_ms must be > 0, got {}",
            self.polling.metrics_interval_ms
        );
        anyhow::ensure!(
            self.metrics.history_capacity > 0,
            "metrics.history_capacity must be > 0, got {}",
            self.metrics.history_capacity
        );
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            self.server.event_capacity > 0,
            "server.event_capacity must be > 0, got {}",
            self.server.event_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            history_capacity: self.metrics.history_capacity,
            event_capacity: self.server.event_capacity,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            inventory_interval: Duration::from_millis(self.polling.inventory_interval_ms),
            metrics_interval: Duration::from_millis(self.polling.metrics_interval_ms),
            stats_log_interval: Duration::from_secs(self.monitoring.stats_log_interval_secs),
        }
    }
}
