use async_trait::async_trait;
use choam_application::backtesting::run_backtest;
use choam_application::config::{self, Config};
use choam_application::live_trading::run_live;
use choam_domain::errors::EngineError;
use choam_domain::repositories::bar_source::BarSource;
use choam_domain::repositories::execution::ExecutionSink;
use choam_domain::value_objects::bar::Bar;
use choam_domain::value_objects::order::Order;
use choam_domain::value_objects::side::Side;
use choam_infrastructure::artifacts::FilesystemArtifactWriter;
use choam_infrastructure::market_data::CsvMarketDataRepository;
use choam_infrastructure::reporting::read_equity_csv;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const RISE_AND_FALL: [f64; 10] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 5.0, 4.0, 3.0, 2.0];

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("choam_{prefix}_{}_{}", std::process::id(), now))
}

fn config_for(dir: &Path, data_path: Option<&Path>) -> Config {
    let mut config: Config = toml::from_str(
        r#"
[run]
run_id = "it"
symbol = "SPY"
initial_capital = 100.0
bar_seconds = 86400

[strategy]
fast = 3
slow = 5

[paths]
out_dir = "unused"
"#,
    )
    .expect("config");
    config.paths.out_dir = dir.join("runs").display().to_string();
    config.paths.data_path = data_path.map(|path| path.display().to_string());
    config
}

fn write_bars_csv(path: &Path, closes: &[f64]) {
    let mut csv = String::from("ts,o,h,l,c,v\n");
    for (idx, close) in closes.iter().enumerate() {
        csv.push_str(&format!(
            "2024-01-{:02},{close},{close},{close},{close},1000\n",
            idx + 1
        ));
    }
    fs::write(path, csv).expect("write bars");
}

fn daily_bars(closes: &[f64]) -> VecDeque<Bar> {
    closes
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
        .collect()
}

/// Delivers its bars, then behaves like an idle live feed.
struct IdleAfter(VecDeque<Bar>);

#[async_trait]
impl BarSource for IdleAfter {
    async fn next_bar(&mut self) -> Result<Option<Bar>, EngineError> {
        match self.0.pop_front() {
            Some(bar) => Ok(Some(bar)),
            None => std::future::pending().await,
        }
    }
}

#[derive(Default)]
struct ScriptedBroker {
    accepted: Vec<Order>,
    reject_side: Option<Side>,
}

#[async_trait]
impl ExecutionSink for ScriptedBroker {
    async fn execute(&mut self, order: &Order, _reference_bar: &Bar) -> Result<(), EngineError> {
        if self.reject_side == Some(order.side) {
            return Err(EngineError::ExecutionFailure(
                "order rejected: market closed".to_string(),
            ));
        }
        self.accepted.push(*order);
        Ok(())
    }
}

#[tokio::test]
async fn backtest_from_csv_writes_artifacts() {
    let dir = unique_tmp_dir("it_backtest");
    fs::create_dir_all(&dir).expect("tmp dir");
    let data = dir.join("bars.csv");
    write_bars_csv(&data, &RISE_AND_FALL);
    let config = config_for(&dir, Some(&data));
    let snapshot = config::to_toml_pretty(&config).expect("snapshot");

    let outcome = run_backtest(
        &config,
        &snapshot,
        None,
        &CsvMarketDataRepository::new(config.run.bar_seconds),
        &FilesystemArtifactWriter::new(),
    )
    .await
    .expect("backtest");

    assert_eq!(outcome.run_dir, dir.join("runs").join("it"));
    let report = &outcome.report;
    assert_eq!(report.summary.bars_processed, 10);
    assert_eq!(report.trades.len(), 1);
    assert_eq!(report.trades[0].entry_price, 5.0);
    assert_eq!(report.trades[0].exit_price, 3.0);
    assert_eq!(report.summary.net_profit, -2.0);

    let trades_csv = fs::read_to_string(outcome.run_dir.join("trades.csv")).expect("trades");
    assert_eq!(trades_csv.lines().count(), 2);
    assert!(trades_csv.lines().nth(1).unwrap().ends_with("signal_exit"));

    let equity = read_equity_csv(&outcome.run_dir.join("equity.csv")).expect("equity");
    assert_eq!(equity, report.equity);
    assert_eq!(equity.first().map(|p| p.equity), Some(100.0));
    assert_eq!(equity.last().map(|p| p.equity), Some(98.0));

    let summary: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(outcome.run_dir.join("summary.json")).expect("summary"),
    )
    .expect("summary json");
    assert_eq!(summary["meta"]["mode"], "backtest");
    assert_eq!(summary["meta"]["symbol"], "SPY");
    assert_eq!(summary["trades"], 1);
    assert!(summary["max_drawdown"].as_f64().unwrap() < 0.0);

    let written = fs::read_to_string(outcome.run_dir.join("config_snapshot.toml")).expect("toml");
    assert_eq!(written, snapshot);
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn backtest_out_dir_override_wins() {
    let dir = unique_tmp_dir("it_backtest_out");
    fs::create_dir_all(&dir).expect("tmp dir");
    let data = dir.join("bars.csv");
    write_bars_csv(&data, &RISE_AND_FALL);
    let config = config_for(&dir, Some(&data));

    let outcome = run_backtest(
        &config,
        "",
        Some(dir.join("elsewhere")),
        &CsvMarketDataRepository::default(),
        &FilesystemArtifactWriter::new(),
    )
    .await
    .expect("backtest");

    assert_eq!(outcome.run_dir, dir.join("elsewhere").join("it"));
    assert!(outcome.run_dir.join("summary.json").exists());
    assert!(!dir.join("runs").exists());
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn missing_csv_is_reported_with_path() {
    let dir = unique_tmp_dir("it_missing");
    let data = dir.join("nope.csv");
    let config = config_for(&dir, Some(&data));

    let err = run_backtest(
        &config,
        "",
        None,
        &CsvMarketDataRepository::default(),
        &FilesystemArtifactWriter::new(),
    )
    .await
    .err()
    .expect("missing data");
    assert!(err.contains("nope.csv"), "{err}");
}

#[tokio::test]
async fn live_run_stops_on_shutdown_and_writes_report() {
    let dir = unique_tmp_dir("it_live");
    let config = config_for(&dir, None);
    let mut source = IdleAfter(daily_bars(&RISE_AND_FALL));
    let mut broker = ScriptedBroker::default();

    let outcome = run_live(
        &config,
        "",
        None,
        &mut source,
        &mut broker,
        tokio::time::sleep(Duration::from_millis(50)),
        &FilesystemArtifactWriter::new(),
    )
    .await
    .expect("live run");

    assert_eq!(broker.accepted, vec![Order::buy(1), Order::sell(1)]);
    assert_eq!(outcome.report.summary.bars_processed, 10);
    assert_eq!(outcome.report.trades.len(), 1);
    assert!(outcome.run_dir.join("trades.csv").exists());
    let _ = fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn live_execution_failure_keeps_partial_history() {
    let dir = unique_tmp_dir("it_live_abort");
    let config = config_for(&dir, None);
    let mut source = IdleAfter(daily_bars(&RISE_AND_FALL));
    let mut broker = ScriptedBroker {
        reject_side: Some(Side::Sell),
        ..ScriptedBroker::default()
    };

    let err = run_live(
        &config,
        "",
        None,
        &mut source,
        &mut broker,
        std::future::pending::<()>(),
        &FilesystemArtifactWriter::new(),
    )
    .await
    .err()
    .expect("run must abort");

    assert!(err.contains("market closed"), "{err}");
    assert!(err.contains("partial results written"), "{err}");
    assert_eq!(broker.accepted, vec![Order::buy(1)]);

    let run_dir = dir.join("runs").join("it");
    // The SELL bar failed, so only the eight bars before it have equity.
    assert_eq!(read_equity_csv(&run_dir.join("equity.csv")).unwrap().len(), 8);
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["meta"]["mode"], "live");
    assert!(summary["meta"]["aborted"]
        .as_str()
        .unwrap()
        .contains("execution failure"));
    let _ = fs::remove_dir_all(&dir);
}
