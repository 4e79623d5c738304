use choam_domain::services::engine::pipeline::RunReport;
use std::fmt::Write;

/// Human-readable run summary: headline statistics followed by the trade log.
pub fn render_summary_text(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "run: {} ({})", report.run_id, report.strategy);
    let _ = writeln!(out, "bars: {}", summary.bars_processed);
    if report.dropped_bars > 0 {
        let _ = writeln!(out, "dropped bars: {}", report.dropped_bars);
    }
    let _ = writeln!(out, "CAGR: {:.2}%", summary.cagr * 100.0);
    let _ = writeln!(out, "Sharpe: {:.2}", summary.sharpe);
    let _ = writeln!(out, "Max drawdown: {:.2}%", summary.max_drawdown * 100.0);
    let _ = writeln!(
        out,
        "trades: {} (win rate {:.1}%, net {:.2})",
        summary.trades,
        summary.win_rate * 100.0,
        summary.net_profit
    );
    for trade in &report.trades {
        let _ = writeln!(
            out,
            "  {} -> {}  qty {}  {:.4} -> {:.4}  pnl {:.2}  [{}]",
            trade.entry_timestamp,
            trade.exit_timestamp,
            trade.quantity,
            trade.entry_price,
            trade.exit_price,
            trade.pnl(),
            trade.exit_reason
        );
    }
    out
}
