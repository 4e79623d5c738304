use crate::services::ohlcv::DataQualityReport;
use crate::value_objects::bar::Bar;
use std::path::Path;

pub trait MarketDataRepository {
    fn load_bars(&self, path: &Path) -> Result<(Vec<Bar>, DataQualityReport), String>;
}
