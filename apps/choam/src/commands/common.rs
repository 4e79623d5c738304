use choam_application::config::{self, Config};
use choam_infrastructure::broker::{BrokerSettings, ReconnectPolicy};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Loaded, env-overridden and validated config plus the TOML snapshot of exactly that config.
pub struct LoadedConfig {
    pub config: Config,
    pub snapshot_toml: String,
}

pub fn load_run_config<F>(
    config_path: &Path,
    env_path: Option<&Path>,
    adjust: F,
) -> Result<LoadedConfig, String>
where
    F: FnOnce(&mut Config),
{
    if let Some(env_path) = env_path {
        config::load_env_file(env_path)?;
    }
    let mut config = config::load_config(config_path)?;
    config::apply_process_env(&mut config)?;
    adjust(&mut config);
    config.validate()?;
    let snapshot_toml = config::to_toml_pretty(&config)?;
    Ok(LoadedConfig {
        config,
        snapshot_toml,
    })
}

pub fn print_config_summary(command: &str, config: &Config, out: Option<&PathBuf>) {
    println!(
        "choam: {} (run_id={}, symbol={}, initial_capital={})",
        command, config.run.run_id, config.run.symbol, config.run.initial_capital
    );
    println!(
        "strategy: sma_crossover fast={} slow={}; risk: trade_qty={} stop_pct={}",
        config.strategy.fast,
        config.strategy.slow,
        config.risk.trade_qty,
        config
            .risk
            .stop_pct
            .map_or_else(|| "off".to_string(), |pct| pct.to_string())
    );
    if let Some(out_dir) = out {
        println!("output dir: {}", out_dir.display());
    }
}

pub fn broker_settings(config: &Config) -> Result<(BrokerSettings, ReconnectPolicy), String> {
    let broker = config.broker.as_ref().ok_or_else(|| {
        format!(
            "live mode requires a [broker] section or {}",
            config::ENV_BROKER_URL
        )
    })?;
    let policy = ReconnectPolicy::new(
        broker.reconnect.max_attempts,
        Duration::from_millis(broker.reconnect.initial_delay_ms),
        Duration::from_millis(broker.reconnect.max_delay_ms),
    )?;
    let settings = BrokerSettings {
        url: broker.url.clone(),
        client_id: broker.client_id,
        symbol: config.run.symbol.clone(),
        timeout: Duration::from_millis(broker.timeout_ms),
        poll_interval: Duration::from_millis(broker.poll_interval_ms),
        bar_size_seconds: broker.bar_size_seconds,
        max_poll_failures: broker.max_poll_failures,
    };
    Ok((settings, policy))
}
