use crate::config::Config;
use crate::execution::BookkeepingSink;
use crate::shared::{build_pipeline, finish_run, RunOutcome};
use choam_domain::repositories::artifacts::ArtifactWriter;
use choam_domain::repositories::market_data::MarketDataRepository;
use choam_domain::services::market_data_source::VecBarSource;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info_span, Instrument};

pub async fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    market_data: &dyn MarketDataRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<RunOutcome, String> {
    let span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        symbol = %config.run.symbol
    );

    let data_path = config
        .paths
        .data_path
        .as_deref()
        .ok_or_else(|| "paths.data_path is required for backtest".to_string())?;

    let stage_start = Instant::now();
    let (bars, report) = span.in_scope(|| market_data.load_bars(Path::new(data_path)))?;
    metrics::histogram!("choam.backtest.load_bars_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    span.in_scope(|| {
        tracing::info!(
            rows = report.rows,
            bars = bars.len(),
            duplicates = report.duplicates,
            out_of_order = report.out_of_order,
            invalid_close = report.invalid_close,
            gaps = report.gaps,
            "bars loaded"
        )
    });

    let pipeline = build_pipeline(config, &span)?;
    let mut source = VecBarSource::new(bars);
    let mut sink = BookkeepingSink::new(info_span!(parent: &span, "bookkeeping_sink"));

    let stage_start = Instant::now();
    let result = pipeline
        .run(&mut source, &mut sink)
        .instrument(span.clone())
        .await;
    let engine_ms = stage_start.elapsed().as_millis() as f64;
    metrics::histogram!("choam.backtest.engine_ms").record(engine_ms);
    metrics::gauge!("choam.backtest.fills").set(sink.fills().len() as f64);

    span.in_scope(|| finish_run(config, config_toml, out, "backtest", result, artifacts))
}

#[cfg(test)]
mod tests {
    use super::run_backtest;
    use crate::config::Config;
    use choam_domain::entities::metrics::PerformanceSummary;
    use choam_domain::repositories::artifacts::ArtifactWriter;
    use choam_domain::repositories::market_data::MarketDataRepository;
    use choam_domain::services::ohlcv::{normalize_bars, DataQualityReport};
    use choam_domain::value_objects::bar::Bar;
    use choam_domain::value_objects::equity_point::EquityPoint;
    use choam_domain::value_objects::trade::Trade;
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    struct InMemoryBars(Vec<f64>);

    impl MarketDataRepository for InMemoryBars {
        fn load_bars(&self, _path: &Path) -> Result<(Vec<Bar>, DataQualityReport), String> {
            let raw = self
                .0
                .iter()
                .enumerate()
                .map(|(idx, close)| Bar {
                    timestamp: 86_400 * (idx as i64 + 1),
                    open: *close,
                    high: *close,
                    low: *close,
                    close: *close,
                    volume: 0.0,
                })
                .collect();
            Ok(normalize_bars(raw, None))
        }
    }

    #[derive(Default)]
    struct CapturingWriter {
        files: RefCell<Vec<PathBuf>>,
        trades: RefCell<Vec<Trade>>,
        equity_len: RefCell<usize>,
        meta: RefCell<Option<serde_json::Value>>,
    }

    impl ArtifactWriter for CapturingWriter {
        fn ensure_dir(&self, _path: &Path) -> Result<(), String> {
            Ok(())
        }

        fn write_trades_csv(&self, path: &Path, trades: &[Trade]) -> Result<(), String> {
            self.files.borrow_mut().push(path.to_path_buf());
            *self.trades.borrow_mut() = trades.to_vec();
            Ok(())
        }

        fn write_equity_csv(&self, path: &Path, points: &[EquityPoint]) -> Result<(), String> {
            self.files.borrow_mut().push(path.to_path_buf());
            *self.equity_len.borrow_mut() = points.len();
            Ok(())
        }

        fn write_summary_json(
            &self,
            path: &Path,
            _summary: &PerformanceSummary,
            meta: Option<&serde_json::Value>,
        ) -> Result<(), String> {
            self.files.borrow_mut().push(path.to_path_buf());
            *self.meta.borrow_mut() = meta.cloned();
            Ok(())
        }

        fn write_config_snapshot_toml(&self, path: &Path, _contents: &str) -> Result<(), String> {
            self.files.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    fn config() -> Config {
        toml::from_str(
            r#"
[run]
run_id = "unit"
symbol = "SPY"

[strategy]
fast = 3
slow = 5

[paths]
data_path = "unused.csv"
out_dir = "runs"
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn backtest_writes_all_artifacts_under_run_dir() {
        let market = InMemoryBars(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0, 2.0]);
        let writer = CapturingWriter::default();
        let outcome = run_backtest(&config(), "", None, &market, &writer)
            .await
            .unwrap();

        assert_eq!(outcome.run_dir, PathBuf::from("runs").join("unit"));
        assert_eq!(outcome.report.summary.bars_processed, 10);
        assert_eq!(outcome.report.trades.len(), 1);
        assert_eq!(*writer.equity_len.borrow(), 10);
        assert_eq!(writer.trades.borrow().len(), 1);

        let names: Vec<String> = writer
            .files
            .borrow()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(
            names,
            vec![
                "trades.csv",
                "equity.csv",
                "summary.json",
                "config_snapshot.toml"
            ]
        );
        let meta = writer.meta.borrow().clone().unwrap();
        assert_eq!(meta["mode"], "backtest");
        assert_eq!(meta["orders_executed"], 2);
    }

    #[tokio::test]
    async fn backtest_requires_data_path() {
        let mut cfg = config();
        cfg.paths.data_path = None;
        let writer = CapturingWriter::default();
        let err = run_backtest(&cfg, "", None, &InMemoryBars(Vec::new()), &writer)
            .await
            .err()
            .unwrap();
        assert!(err.contains("data_path"));
    }

    #[tokio::test]
    async fn invalid_windows_fail_before_running() {
        let mut cfg = config();
        cfg.strategy.fast = 9;
        let writer = CapturingWriter::default();
        let err = run_backtest(&cfg, "", None, &InMemoryBars(vec![1.0]), &writer)
            .await
            .err()
            .unwrap();
        assert!(writer.files.borrow().is_empty());
        assert!(err.starts_with("invalid configuration"));
    }
}
