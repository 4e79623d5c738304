pub mod artifacts;
pub mod bar_source;
pub mod execution;
pub mod market_data;
