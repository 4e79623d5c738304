use super::common::{load_run_config, print_config_summary};
use choam_application::backtesting::run_backtest;
use choam_application::reporting::render_summary_text;
use choam_infrastructure::artifacts::FilesystemArtifactWriter;
use choam_infrastructure::market_data::CsvMarketDataRepository;
use std::path::PathBuf;

pub fn run(
    config_path: PathBuf,
    env_path: Option<PathBuf>,
    file: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let loaded = load_run_config(&config_path, env_path.as_deref(), |config| {
        if let Some(file) = &file {
            config.paths.data_path = Some(file.display().to_string());
        }
    })?;
    let config = &loaded.config;
    print_config_summary("backtest", config, out.as_ref());

    let market_data = CsvMarketDataRepository::new(config.run.bar_seconds);
    let artifacts = FilesystemArtifactWriter::new();
    let outcome = super::runtime()?.block_on(run_backtest(
        config,
        &loaded.snapshot_toml,
        out,
        &market_data,
        &artifacts,
    ))?;

    print!("{}", render_summary_text(&outcome.report));
    println!("artifacts: {}", outcome.run_dir.display());
    Ok(())
}
