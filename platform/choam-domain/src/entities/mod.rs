pub mod metrics;
pub mod risk;
