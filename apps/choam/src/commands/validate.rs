use super::common::load_run_config;
use choam_infrastructure::market_data::CsvMarketDataRepository;
use std::path::PathBuf;

pub fn run(config_path: PathBuf, env_path: Option<PathBuf>, strict: bool) -> Result<(), String> {
    let loaded = load_run_config(&config_path, env_path.as_deref(), |_| {})?;
    let market_data = CsvMarketDataRepository::new(loaded.config.run.bar_seconds);
    let report = choam_application::validation::validate(&loaded.config, strict, &market_data)?;
    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to render validation report: {err}"))?;
    println!("{rendered}");
    Ok(())
}
