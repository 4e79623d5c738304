pub mod engine;
pub mod features;
pub mod market_data_source;
pub mod ohlcv;
pub mod strategy;
