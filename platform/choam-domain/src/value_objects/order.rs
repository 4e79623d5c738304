use crate::value_objects::side::Side;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Intent to trade; not a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub quantity: u64,
}

impl Order {
    pub fn buy(quantity: u64) -> Self {
        Self {
            side: Side::Buy,
            quantity,
        }
    }

    pub fn sell(quantity: u64) -> Self {
        Self {
            side: Side::Sell,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderReason {
    Entry,
    SignalExit,
    StopLoss,
}

impl OrderReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderReason::Entry => "entry",
            OrderReason::SignalExit => "signal_exit",
            OrderReason::StopLoss => "stop_loss",
        }
    }
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order the position controller wants executed, tagged with what triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub order: Order,
    pub reason: OrderReason,
}
