use choam_domain::entities::metrics::MetricsConfig as DomainMetricsConfig;
use choam_domain::entities::risk::RiskConfig as DomainRiskConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ENV_TRADE_QTY: &str = "CHOAM_TRADE_QTY";
pub const ENV_STOP_PCT: &str = "CHOAM_STOP_PCT";
pub const ENV_BROKER_URL: &str = "CHOAM_BROKER_URL";
pub const ENV_BROKER_CLIENT_ID: &str = "CHOAM_BROKER_CLIENT_ID";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub paths: PathsConfig,
    pub broker: Option<BrokerConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub symbol: String,
    #[serde(default)]
    pub initial_capital: f64,
    /// Expected spacing of historical bars; enables gap counting in the data-quality report.
    pub bar_seconds: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    #[serde(default = "default_fast")]
    pub fast: usize,
    #[serde(default = "default_slow")]
    pub slow: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            fast: default_fast(),
            slow: default_slow(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    #[serde(default = "default_trade_qty")]
    pub trade_qty: u64,
    pub stop_pct: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            trade_qty: default_trade_qty(),
            stop_pct: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    #[serde(default)]
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: default_periods_per_year(),
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Historical bars for `backtest` and `validate`.
    pub data_path: Option<String>,
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub url: String,
    #[serde(default = "default_client_id")]
    pub client_id: u32,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_bar_size_seconds")]
    pub bar_size_seconds: u64,
    /// Consecutive failed bar polls tolerated before the live feed gives up.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl BrokerConfig {
    fn with_url(url: String) -> Self {
        Self {
            url,
            client_id: default_client_id(),
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            bar_size_seconds: default_bar_size_seconds(),
            max_poll_failures: default_max_poll_failures(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_fast() -> usize {
    5
}

fn default_slow() -> usize {
    60
}

fn default_trade_qty() -> u64 {
    1
}

fn default_periods_per_year() -> f64 {
    252.0
}

fn default_client_id() -> u32 {
    1
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_bar_size_seconds() -> u64 {
    60
}

fn default_max_poll_failures() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    8
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Config {
    pub fn risk_config(&self) -> DomainRiskConfig {
        DomainRiskConfig {
            trade_qty: self.risk.trade_qty,
            stop_pct: self.risk.stop_pct,
        }
    }

    pub fn metrics_config(&self) -> DomainMetricsConfig {
        DomainMetricsConfig {
            periods_per_year: self.metrics.periods_per_year,
            risk_free_rate: self.metrics.risk_free_rate,
        }
    }

    /// Checks the merged configuration before any run starts.
    pub fn validate(&self) -> Result<(), String> {
        if self.run.run_id.trim().is_empty() {
            return Err("run.run_id must not be empty".to_string());
        }
        if self.run.symbol.trim().is_empty() {
            return Err("run.symbol must not be empty".to_string());
        }
        if !self.run.initial_capital.is_finite() || self.run.initial_capital < 0.0 {
            return Err("run.initial_capital must be finite and >= 0".to_string());
        }
        if matches!(self.run.bar_seconds, Some(step) if step <= 0) {
            return Err("run.bar_seconds must be > 0".to_string());
        }
        if self.strategy.fast == 0 || self.strategy.fast >= self.strategy.slow {
            return Err(format!(
                "strategy windows must satisfy 0 < fast < slow (got fast={}, slow={})",
                self.strategy.fast, self.strategy.slow
            ));
        }
        self.risk_config().validate().map_err(|err| err.to_string())?;
        self.metrics_config()
            .validate()
            .map_err(|err| err.to_string())?;
        if self.paths.out_dir.trim().is_empty() {
            return Err("paths.out_dir must not be empty".to_string());
        }
        if let Some(broker) = &self.broker {
            validate_broker(broker)?;
        }
        Ok(())
    }
}

fn validate_broker(broker: &BrokerConfig) -> Result<(), String> {
    let parsed = url::Url::parse(&broker.url)
        .map_err(|err| format!("broker.url is not a valid URL ({}): {err}", broker.url))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!(
            "broker.url must use http or https (got {})",
            parsed.scheme()
        ));
    }
    if broker.timeout_ms == 0 {
        return Err("broker.timeout_ms must be > 0".to_string());
    }
    if broker.poll_interval_ms == 0 {
        return Err("broker.poll_interval_ms must be > 0".to_string());
    }
    if broker.bar_size_seconds == 0 {
        return Err("broker.bar_size_seconds must be > 0".to_string());
    }
    if broker.max_poll_failures == 0 {
        return Err("broker.max_poll_failures must be > 0".to_string());
    }
    let reconnect = &broker.reconnect;
    if reconnect.max_attempts == 0 {
        return Err("broker.reconnect.max_attempts must be > 0".to_string());
    }
    if reconnect.initial_delay_ms == 0 || reconnect.initial_delay_ms > reconnect.max_delay_ms {
        return Err(format!(
            "broker.reconnect delays must satisfy 0 < initial_delay_ms <= max_delay_ms (got {} / {})",
            reconnect.initial_delay_ms, reconnect.max_delay_ms
        ));
    }
    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

/// Loads `KEY=value` pairs from a dotenv file into the process environment.
/// Variables already set in the environment win.
pub fn load_env_file(path: &Path) -> Result<(), String> {
    dotenv::from_path(path)
        .map_err(|err| format!("failed to load env file {}: {}", path.display(), err))
}

pub fn apply_process_env(config: &mut Config) -> Result<(), String> {
    apply_env_overrides(config, |key| std::env::var(key).ok())
}

/// Applies `CHOAM_*` overrides on top of the file configuration.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_TRADE_QTY) {
        config.risk.trade_qty = raw
            .trim()
            .parse()
            .map_err(|err| format!("{ENV_TRADE_QTY} must be a positive integer ({raw}): {err}"))?;
    }

    if let Some(raw) = lookup(ENV_STOP_PCT) {
        let raw = raw.trim();
        config.risk.stop_pct = if raw.is_empty() {
            None
        } else {
            let value: f64 = raw
                .parse()
                .map_err(|err| format!("{ENV_STOP_PCT} must be a number ({raw}): {err}"))?;
            // 0 disables the stop.
            if value == 0.0 {
                None
            } else {
                Some(value)
            }
        };
    }

    if let Some(url) = lookup(ENV_BROKER_URL) {
        let url = url.trim().to_string();
        match config.broker.as_mut() {
            Some(broker) => broker.url = url,
            None => config.broker = Some(BrokerConfig::with_url(url)),
        }
    }

    if let Some(raw) = lookup(ENV_BROKER_CLIENT_ID) {
        let client_id: u32 = raw.trim().parse().map_err(|err| {
            format!("{ENV_BROKER_CLIENT_ID} must be a non-negative integer ({raw}): {err}")
        })?;
        let Some(broker) = config.broker.as_mut() else {
            return Err(format!(
                "{ENV_BROKER_CLIENT_ID} is set but no broker is configured (set broker.url or {ENV_BROKER_URL})"
            ));
        };
        broker.client_id = client_id;
    }

    Ok(())
}
