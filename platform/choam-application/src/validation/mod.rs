use crate::config::Config;
use choam_domain::repositories::market_data::MarketDataRepository;
use choam_domain::services::ohlcv::DataQualityReport;
use std::path::Path;
use std::time::Instant;
use tracing::info_span;

/// Validates the merged config and, when a data path is configured, the historical bars.
/// With `strict`, any data-quality finding is an error.
pub fn validate(
    config: &Config,
    strict: bool,
    market_data: &dyn MarketDataRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    )
    .entered();

    config.validate()?;

    let data = match config.paths.data_path.as_deref() {
        Some(path) => {
            let stage_start = Instant::now();
            let (bars, report) = market_data.load_bars(Path::new(path))?;
            metrics::histogram!("choam.validate.load_bars_ms")
                .record(stage_start.elapsed().as_millis() as f64);

            if strict && !report.is_clean() {
                return Err(format!(
                    "data quality check failed for {path}: duplicates={}, out_of_order={}, invalid_close={}",
                    report.duplicates, report.out_of_order, report.invalid_close
                ));
            }
            if bars.len() < config.strategy.slow {
                tracing::warn!(
                    bars = bars.len(),
                    slow = config.strategy.slow,
                    "fewer bars than the slow window; no signal will be emitted"
                );
            }
            Some(data_quality_json(path, bars.len(), &report))
        }
        None => None,
    };

    Ok(serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": config.run.symbol,
        "strict": strict,
        "strategy": {
            "fast": config.strategy.fast,
            "slow": config.strategy.slow,
        },
        "risk": {
            "trade_qty": config.risk.trade_qty,
            "stop_pct": config.risk.stop_pct,
        },
        "broker": config.broker.as_ref().map(|broker| serde_json::json!({
            "url": broker.url,
            "client_id": broker.client_id,
        })),
        "data": data,
    }))
}

fn data_quality_json(path: &str, bars: usize, report: &DataQualityReport) -> serde_json::Value {
    serde_json::json!({
        "path": path,
        "bars": bars,
        "report": report,
    })
}
