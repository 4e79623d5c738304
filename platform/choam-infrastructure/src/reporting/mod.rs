use choam_domain::entities::metrics::PerformanceSummary;
use choam_domain::value_objects::equity_point::EquityPoint;
use choam_domain::value_objects::trade::Trade;
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn write_trades_csv(path: &Path, trades: &[Trade]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create trades csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "entry_timestamp",
        "exit_timestamp",
        "entry_price",
        "exit_price",
        "qty",
        "pnl",
        "exit_reason",
    ])
    .map_err(|err| format!("failed to write trades csv header: {}", err))?;

    for trade in trades {
        wtr.write_record([
            trade.entry_timestamp.to_string(),
            trade.exit_timestamp.to_string(),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            trade.quantity.to_string(),
            trade.pnl().to_string(),
            trade.exit_reason.as_str().to_string(),
        ])
        .map_err(|err| format!("failed to write trades row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush trades csv: {}", err))
}

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create equity csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "timestamp",
        "equity",
        "cash",
        "position_qty",
        "unrealized_pnl",
        "realized_pnl",
    ])
    .map_err(|err| format!("failed to write equity csv header: {}", err))?;

    for point in points {
        wtr.write_record([
            point.timestamp.to_string(),
            point.equity.to_string(),
            point.cash.to_string(),
            point.position_qty.to_string(),
            point.unrealized_pnl.to_string(),
            point.realized_pnl.to_string(),
        ])
        .map_err(|err| format!("failed to write equity row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush equity csv: {}", err))
}

pub fn write_summary_json(
    path: &Path,
    summary: &PerformanceSummary,
    meta: Option<&serde_json::Value>,
) -> Result<(), String> {
    let json = serde_json::json!({
        "meta": meta,
        "bars_processed": summary.bars_processed,
        "trades": summary.trades,
        "win_rate": summary.win_rate,
        "net_profit": summary.net_profit,
        "cagr": summary.cagr,
        "sharpe": summary.sharpe,
        "max_drawdown": summary.max_drawdown,
    });
    let json = serde_json::to_string_pretty(&json)
        .map_err(|err| format!("failed to serialize summary: {}", err))?;
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create summary: {}", err))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write summary: {}", err))
}

pub fn read_equity_csv(path: &Path) -> Result<Vec<EquityPoint>, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open equity csv {}: {}", path.display(), err))?;
    let mut points = Vec::new();
    for result in rdr.deserialize::<EquityPoint>() {
        points.push(result.map_err(|err| format!("failed to parse equity row: {}", err))?);
    }
    Ok(points)
}
