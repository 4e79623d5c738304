use crate::errors::EngineError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskConfig {
    pub trade_qty: u64,
    /// Fraction below the entry price that forces an exit. `None` disables the stop.
    pub stop_pct: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            trade_qty: 1,
            stop_pct: None,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.trade_qty == 0 {
            return Err(EngineError::InvalidConfiguration(
                "risk.trade_qty must be > 0".to_string(),
            ));
        }
        if let Some(stop_pct) = self.stop_pct {
            if !stop_pct.is_finite() || stop_pct <= 0.0 || stop_pct >= 1.0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "risk.stop_pct must be in (0, 1) (got {stop_pct})"
                )));
            }
        }
        Ok(())
    }

    pub fn stop_price(&self, entry_price: f64) -> Option<f64> {
        self.stop_pct.map(|pct| entry_price * (1.0 - pct))
    }
}
