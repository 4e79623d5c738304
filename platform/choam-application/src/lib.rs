pub mod backtesting;
pub mod config;
pub mod execution;
pub mod live_trading;
pub mod reporting;
mod shared;
pub mod validation;

pub use shared::RunOutcome;
