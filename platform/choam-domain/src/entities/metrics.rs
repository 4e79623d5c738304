use crate::errors::EngineError;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::Trade;
use serde::Serialize;

/// Floor applied to denominators so zero or negative equity never divides by zero.
pub const EQUITY_EPSILON: f64 = 1e-9;

// Below this the standard deviation is float noise from a constant return series.
const MIN_STDDEV: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsConfig {
    pub periods_per_year: f64,
    /// Annual rate, spread evenly over `periods_per_year`.
    pub risk_free_rate: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "metrics.periods_per_year must be > 0 (got {})",
                self.periods_per_year
            )));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "metrics.risk_free_rate must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub bars_processed: usize,
    pub trades: usize,
    pub win_rate: f64,
    pub net_profit: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
}

impl PerformanceSummary {
    pub fn compute(equity: &[EquityPoint], trades: &[Trade], config: &MetricsConfig) -> Self {
        let curve: Vec<f64> = equity.iter().map(|point| point.equity).collect();
        let returns = simple_returns(&curve);
        Self {
            bars_processed: equity.len(),
            trades: trades.len(),
            win_rate: win_rate(trades),
            net_profit: trades.iter().map(Trade::pnl).sum(),
            cagr: cagr(&curve, config.periods_per_year),
            sharpe: sharpe_ratio(&returns, config.risk_free_rate, config.periods_per_year),
            max_drawdown: max_drawdown(&curve),
        }
    }
}

/// Compound annual growth rate, treating each point as one period.
///
/// A curve that starts at zero, or below it, has no meaningful growth rate and yields 0.
/// A positive start that ends at or below zero is a total loss (-1).
pub fn cagr(equity: &[f64], periods_per_year: f64) -> f64 {
    let (Some(&first), Some(&last)) = (equity.first(), equity.last()) else {
        return 0.0;
    };
    if first <= 0.0 || !periods_per_year.is_finite() || periods_per_year <= 0.0 {
        return 0.0;
    }
    let years = equity.len() as f64 / periods_per_year;
    if years == 0.0 {
        return 0.0;
    }
    let ratio = last / first;
    if ratio <= 0.0 {
        return -1.0;
    }
    ratio.powf(1.0 / years) - 1.0
}

/// Per-period simple returns. Each denominator is floored at [`EQUITY_EPSILON`].
pub fn simple_returns(equity: &[f64]) -> Vec<f64> {
    equity
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0].max(EQUITY_EPSILON))
        .collect()
}

/// Annualized Sharpe ratio using the population standard deviation of excess returns.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> f64 {
    if returns.is_empty() || !periods_per_year.is_finite() || periods_per_year <= 0.0 {
        return 0.0;
    }
    let per_period_rf = risk_free_rate / periods_per_year;
    let n = returns.len() as f64;
    let mean = returns.iter().map(|r| r - per_period_rf).sum::<f64>() / n;
    let var = returns
        .iter()
        .map(|r| {
            let diff = r - per_period_rf - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    let std = var.sqrt();
    if !std.is_finite() || std <= MIN_STDDEV {
        return 0.0;
    }
    periods_per_year.sqrt() * mean / std
}

/// Most negative `equity / running_peak - 1`, as a fraction in `[-1, 0]` for positive curves.
///
/// Points reached before the running peak exceeds [`EQUITY_EPSILON`] carry no drawdown.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &value in equity {
        peak = peak.max(value);
        if peak < EQUITY_EPSILON {
            continue;
        }
        let drawdown = value / peak - 1.0;
        if drawdown < worst {
            worst = drawdown;
        }
    }
    worst
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|trade| trade.pnl() > 0.0).count();
    wins as f64 / trades.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::order::OrderReason;

    fn trade(entry: f64, exit: f64) -> Trade {
        Trade {
            entry_timestamp: 0,
            exit_timestamp: 1,
            entry_price: entry,
            exit_price: exit,
            quantity: 1,
            exit_reason: OrderReason::SignalExit,
        }
    }

    #[test]
    fn degenerate_inputs_are_neutral() {
        assert_eq!(cagr(&[], 252.0), 0.0);
        assert_eq!(cagr(&[0.0, 10.0], 252.0), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(sharpe_ratio(&[], 0.0, 252.0), 0.0);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn cagr_compounds_over_years() {
        // 504 points at 252 per year is two years; doubling gives sqrt(2) - 1.
        let mut curve = vec![100.0; 504];
        curve[503] = 200.0;
        let value = cagr(&curve, 252.0);
        assert!((value - (2f64.sqrt() - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn cagr_of_wipeout_is_total_loss() {
        assert_eq!(cagr(&[100.0, 50.0, -5.0], 252.0), -1.0);
    }

    #[test]
    fn max_drawdown_of_non_decreasing_curve_is_zero() {
        assert_eq!(max_drawdown(&[1.0, 1.0, 2.0, 3.5, 3.5]), 0.0);
        assert_eq!(max_drawdown(&[0.0, 0.0, 100.0, 101.0]), 0.0);
    }

    #[test]
    fn max_drawdown_measures_from_running_peak() {
        let dd = max_drawdown(&[100.0, 120.0, 90.0, 130.0, 117.0]);
        assert!((dd - (90.0 / 120.0 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn sharpe_of_constant_returns_is_zero() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01, 0.01], 0.0, 252.0), 0.0);
        let doubling = simple_returns(&[1.0, 2.0, 4.0, 8.0, 16.0]);
        assert_eq!(sharpe_ratio(&doubling, 0.0, 252.0), 0.0);
    }

    #[test]
    fn sharpe_uses_population_stddev_and_annualizes() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let mean = 0.005;
        let var = [0.005f64, -0.015, 0.015, -0.005]
            .iter()
            .map(|d| d * d)
            .sum::<f64>()
            / 4.0;
        let expected = 252f64.sqrt() * mean / var.sqrt();
        assert!((sharpe_ratio(&returns, 0.0, 252.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn sharpe_subtracts_per_period_risk_free_rate() {
        let returns = [0.01, -0.01, 0.02, 0.0];
        let with_rf = sharpe_ratio(&returns, 0.252, 252.0);
        let without = sharpe_ratio(&returns, 0.0, 252.0);
        assert!(with_rf < without);
    }

    #[test]
    fn simple_returns_floor_zero_denominators() {
        let returns = simple_returns(&[0.0, 1.0]);
        assert_eq!(returns.len(), 1);
        assert!((returns[0] - 1.0 / EQUITY_EPSILON).abs() < 1.0);
    }

    #[test]
    fn summary_counts_trades_and_profit() {
        let equity: Vec<EquityPoint> = [100.0, 101.0, 99.0]
            .iter()
            .enumerate()
            .map(|(idx, value)| EquityPoint {
                timestamp: idx as i64,
                equity: *value,
                cash: *value,
                position_qty: 0,
                unrealized_pnl: 0.0,
                realized_pnl: 0.0,
            })
            .collect();
        let trades = vec![trade(10.0, 12.0), trade(10.0, 9.0)];
        let summary = PerformanceSummary::compute(&equity, &trades, &MetricsConfig::default());
        assert_eq!(summary.bars_processed, 3);
        assert_eq!(summary.trades, 2);
        assert!((summary.net_profit - 1.0).abs() < 1e-12);
        assert!((summary.win_rate - 0.5).abs() < 1e-12);
        assert!(summary.max_drawdown < 0.0);
    }

    #[test]
    fn metrics_config_rejects_non_positive_periods() {
        let cfg = MetricsConfig {
            periods_per_year: 0.0,
            risk_free_rate: 0.0,
        };
        assert!(cfg.validate().is_err());
    }
}
