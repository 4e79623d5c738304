use crate::value_objects::order::OrderReason;
use serde::Serialize;

/// A closed round trip. Appended once per LONG -> FLAT transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: u64,
    pub exit_reason: OrderReason,
}

impl Trade {
    pub fn pnl(&self) -> f64 {
        self.quantity as f64 * (self.exit_price - self.entry_price)
    }
}
