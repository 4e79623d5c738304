use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use choam_domain::repositories::market_data::MarketDataRepository;
use choam_domain::services::ohlcv::{normalize_bars, DataQualityReport};
use choam_domain::value_objects::bar::Bar;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

/// One CSV row. Both the long (`timestamp,open,...`) and short (`ts,o,h,l,c,v`) headers are
/// accepted.
#[derive(Debug, Deserialize)]
pub struct BarRecord {
    #[serde(alias = "ts", alias = "timestamp_utc", alias = "date")]
    pub timestamp: String,
    #[serde(alias = "o")]
    pub open: f64,
    #[serde(alias = "h")]
    pub high: f64,
    #[serde(alias = "l")]
    pub low: f64,
    #[serde(alias = "c")]
    pub close: f64,
    #[serde(alias = "v", default)]
    pub volume: f64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvMarketDataRepository {
    expected_step_seconds: Option<i64>,
}

impl CsvMarketDataRepository {
    pub fn new(expected_step_seconds: Option<i64>) -> Self {
        Self {
            expected_step_seconds,
        }
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn load_bars(&self, path: &Path) -> Result<(Vec<Bar>, DataQualityReport), String> {
        load_csv_with_step(path, self.expected_step_seconds)
    }
}

pub fn load_csv(path: &Path) -> Result<(Vec<Bar>, DataQualityReport), String> {
    load_csv_with_step(path, None)
}

pub fn load_csv_with_step(
    path: &Path,
    expected_step_seconds: Option<i64>,
) -> Result<(Vec<Bar>, DataQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open bars CSV {}: {}", path.display(), err))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut raw = Vec::new();
    for (idx, result) in reader.deserialize::<BarRecord>().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = result.map_err(|err| {
            format!("failed to parse CSV row {} in {}: {}", line, path.display(), err)
        })?;
        let timestamp = parse_timestamp(&record.timestamp)
            .map_err(|err| format!("{} (line {} of {})", err, line, path.display()))?;
        raw.push(Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    let (bars, report) = normalize_bars(raw, expected_step_seconds);
    if !report.is_clean() {
        tracing::warn!(
            path = %path.display(),
            duplicates = report.duplicates,
            out_of_order = report.out_of_order,
            invalid_close = report.invalid_close,
            "bars CSV needed cleanup"
        );
    }
    Ok((bars, report))
}

/// Epoch seconds from RFC3339, `YYYY-MM-DD HH:MM:SS[%z]`, `YYYY-MM-DD` or a bare integer.
/// Naive values are read as UTC.
pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    if let Ok(epoch) = value.parse::<i64>() {
        return Ok(epoch);
    }

    Err(format!("unsupported timestamp format: {}", value))
}
