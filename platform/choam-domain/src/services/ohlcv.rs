use crate::value_objects::bar::Bar;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub gaps: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_gap: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
    pub first_invalid_close: Option<i64>,
    pub max_gap_seconds: Option<i64>,
}

impl DataQualityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicates == 0 && self.out_of_order == 0 && self.invalid_close == 0
    }
}

/// Orders raw rows by timestamp and drops the ones the engine cannot trade on.
///
/// Duplicate timestamps keep the last row read. Rows whose close is non-finite or
/// non-positive are dropped. Gaps are only counted when `expected_step_seconds` is known.
pub fn normalize_bars(
    raw: Vec<Bar>,
    expected_step_seconds: Option<i64>,
) -> (Vec<Bar>, DataQualityReport) {
    let mut report = DataQualityReport {
        rows: raw.len(),
        ..DataQualityReport::default()
    };

    let mut last_seen: Option<i64> = None;
    let mut by_ts: BTreeMap<i64, Bar> = BTreeMap::new();
    for bar in raw {
        let ts = bar.timestamp;
        if let Some(prev) = last_seen {
            if ts < prev {
                report.out_of_order += 1;
                report.first_out_of_order.get_or_insert(ts);
            }
        }
        last_seen = Some(ts);

        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
            report.first_invalid_close.get_or_insert(ts);
            continue;
        }
        if by_ts.insert(ts, bar).is_some() {
            report.duplicates += 1;
            report.first_duplicate.get_or_insert(ts);
        }
    }

    let bars: Vec<Bar> = by_ts.into_values().collect();
    report.first_timestamp = bars.first().map(|bar| bar.timestamp);
    report.last_timestamp = bars.last().map(|bar| bar.timestamp);

    if let Some(step) = expected_step_seconds.filter(|step| *step > 0) {
        for pair in bars.windows(2) {
            let diff = pair[1].timestamp - pair[0].timestamp;
            if diff > step {
                report.gaps += 1;
                report.first_gap.get_or_insert(pair[1].timestamp);
                report.max_gap_seconds = Some(report.max_gap_seconds.map_or(diff, |m| m.max(diff)));
            }
        }
    }

    (bars, report)
}

#[cfg(test)]
mod tests {
    use super::normalize_bars;
    use crate::value_objects::bar::Bar;

    fn bar(timestamp: i64, close: f64) -> Bar {
        Bar {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn sorts_and_keeps_last_duplicate() {
        let raw = vec![bar(120, 3.0), bar(60, 1.0), bar(60, 2.0), bar(180, 4.0)];
        let (bars, report) = normalize_bars(raw, Some(60));
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![2.0, 3.0, 4.0]);
        assert_eq!(report.rows, 4);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.first_duplicate, Some(60));
        assert_eq!(report.out_of_order, 1);
        assert_eq!(report.first_timestamp, Some(60));
        assert_eq!(report.last_timestamp, Some(180));
        assert_eq!(report.gaps, 0);
    }

    #[test]
    fn drops_invalid_close_and_counts_gaps() {
        let raw = vec![bar(0, 1.0), bar(60, f64::NAN), bar(120, 0.0), bar(300, 2.0)];
        let (bars, report) = normalize_bars(raw, Some(60));
        assert_eq!(bars.len(), 2);
        assert_eq!(report.invalid_close, 2);
        assert_eq!(report.first_invalid_close, Some(60));
        assert_eq!(report.gaps, 1);
        assert_eq!(report.max_gap_seconds, Some(300));
        assert!(!report.is_clean());
    }

    #[test]
    fn empty_input_yields_empty_report() {
        let (bars, report) = normalize_bars(Vec::new(), None);
        assert!(bars.is_empty());
        assert!(report.is_clean());
        assert_eq!(report.first_timestamp, None);
    }
}
