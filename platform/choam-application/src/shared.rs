use crate::config::Config;
use choam_domain::repositories::artifacts::ArtifactWriter;
use choam_domain::services::engine::controller::PositionController;
use choam_domain::services::engine::pipeline::{Pipeline, RunAborted, RunReport};
use choam_domain::services::strategy::SmaCrossover;
use std::path::PathBuf;
use tracing::{info_span, Span};

pub struct RunOutcome {
    pub run_dir: PathBuf,
    pub report: RunReport,
}

pub fn build_pipeline(config: &Config, run_span: &Span) -> Result<Pipeline<SmaCrossover>, String> {
    let strategy = SmaCrossover::new(
        config.strategy.fast,
        config.strategy.slow,
        config.risk.trade_qty,
        info_span!(
            parent: run_span,
            "strategy",
            fast = config.strategy.fast,
            slow = config.strategy.slow
        ),
    )
    .map_err(|err| err.to_string())?;
    let controller = PositionController::new(
        config.risk_config(),
        config.run.initial_capital,
        info_span!(parent: run_span, "controller"),
    )
    .map_err(|err| err.to_string())?;
    Ok(Pipeline::new(
        config.run.run_id.clone(),
        strategy,
        controller,
        config.metrics_config(),
        info_span!(parent: run_span, "pipeline"),
    ))
}

pub fn summary_meta_json(config: &Config, report: &RunReport, mode: &str) -> serde_json::Value {
    serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": config.run.symbol,
        "mode": mode,
        "strategy": report.strategy,
        "fast": config.strategy.fast,
        "slow": config.strategy.slow,
        "trade_qty": config.risk.trade_qty,
        "stop_pct": config.risk.stop_pct,
        "start": report.equity.first().map(|point| point.timestamp),
        "end": report.equity.last().map(|point| point.timestamp),
        "orders_executed": report.orders_executed,
        "dropped_bars": report.dropped_bars,
    })
}

pub fn record_run_metrics(mode: &'static str, report: &RunReport) {
    metrics::counter!("choam.bars_processed", "mode" => mode)
        .increment(report.summary.bars_processed as u64);
    metrics::counter!("choam.bars_dropped", "mode" => mode).increment(report.dropped_bars as u64);
    for trade in &report.trades {
        metrics::counter!(
            "choam.trades.closed",
            "mode" => mode,
            "exit_reason" => trade.exit_reason.as_str()
        )
        .increment(1);
    }
    metrics::gauge!("choam.run.net_profit", "mode" => mode).set(report.summary.net_profit);
    metrics::gauge!("choam.run.max_drawdown", "mode" => mode).set(report.summary.max_drawdown);
}

/// Writes the report artifacts. An aborted run still writes its partial history, then the
/// abort is surfaced as the error.
pub fn finish_run(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    mode: &'static str,
    result: Result<RunReport, RunAborted>,
    artifacts: &dyn ArtifactWriter,
) -> Result<RunOutcome, String> {
    match result {
        Ok(report) => {
            record_run_metrics(mode, &report);
            let run_dir = write_outputs(config, config_toml, out, mode, &report, None, artifacts)?;
            Ok(RunOutcome { run_dir, report })
        }
        Err(aborted) => {
            metrics::counter!("choam.runs.aborted", "mode" => mode, "kind" => aborted.error.kind())
                .increment(1);
            record_run_metrics(mode, &aborted.partial);
            let error = aborted.error.to_string();
            let run_dir = write_outputs(
                config,
                config_toml,
                out,
                mode,
                &aborted.partial,
                Some(&error),
                artifacts,
            )?;
            Err(format!(
                "{aborted} (partial results written to {})",
                run_dir.display()
            ))
        }
    }
}

fn write_outputs(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    mode: &str,
    report: &RunReport,
    error: Option<&str>,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = base_dir.join(&config.run.run_id);
    artifacts.ensure_dir(&run_dir)?;

    artifacts.write_trades_csv(run_dir.join("trades.csv").as_path(), &report.trades)?;
    artifacts.write_equity_csv(run_dir.join("equity.csv").as_path(), &report.equity)?;

    let mut meta = summary_meta_json(config, report, mode);
    if let (Some(error), Some(object)) = (error, meta.as_object_mut()) {
        object.insert("aborted".to_string(), serde_json::Value::from(error));
    }
    artifacts.write_summary_json(
        run_dir.join("summary.json").as_path(),
        &report.summary,
        Some(&meta),
    )?;
    artifacts
        .write_config_snapshot_toml(run_dir.join("config_snapshot.toml").as_path(), config_toml)?;

    Ok(run_dir)
}
