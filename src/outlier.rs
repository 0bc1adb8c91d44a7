//! Median-based outlier rejection, applied to every measurement series
//! before any statistic is computed.

use crate::error::RangingError;
use crate::measurement_set::MeasurementSet;
use log::debug;
use std::cmp::Ordering;

/// The result of filtering one series.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// The values that survived, in their original order.
    pub retained: Vec<f64>,
    /// How many values were thrown away.
    pub removed: usize,
}

/// The sample median. For an even number of values this is the mean of the
/// two middle values.
pub fn median(values: &[f64]) -> Result<f64, RangingError> {
    if values.is_empty() {
        return Err(RangingError::EmptyInput);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = sorted.len();
    if n % 2 == 0 {
        Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    } else {
        Ok(sorted[n / 2])
    }
}

/// Keeps every value strictly closer than `threshold` to the median.
///
/// An empty series is returned unchanged with nothing removed.
pub fn filter_outliers(values: &[f64], threshold: f64) -> FilterOutcome {
    let Ok(med) = median(values) else {
        return FilterOutcome {
            retained: Vec::new(),
            removed: 0,
        };
    };

    let retained: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (v - med).abs() < threshold)
        .collect();
    let removed = values.len() - retained.len();

    debug!("Filtered {removed} outliers around median {med}");

    FilterOutcome { retained, removed }
}

/// Like [`filter_outliers`], but an empty series is an error.
pub fn filter_outliers_nonempty(
    values: &[f64],
    threshold: f64,
) -> Result<FilterOutcome, RangingError> {
    if values.is_empty() {
        return Err(RangingError::EmptyInput);
    }
    Ok(filter_outliers(values, threshold))
}

/// Filters each series of a measurement set independently, keeping the
/// configuration parameter attached to every surviving distance. Returns the
/// filtered set and the total number of removed measurements.
pub fn filter_measurement_set<K>(
    set: &MeasurementSet<K>,
    threshold: f64,
) -> (MeasurementSet<K>, usize)
where
    K: Ord + Clone,
{
    let mut total_removed = 0;
    let filtered = set.map_series(|series| {
        let distances: Vec<f64> = series.iter().map(|m| m.distance).collect();
        let Ok(med) = median(&distances) else {
            return Vec::new();
        };
        let kept: Vec<_> = series
            .iter()
            .filter(|m| (m.distance - med).abs() < threshold)
            .cloned()
            .collect();
        total_removed += series.len() - kept.len();
        kept
    });

    debug!("Filtered {total_removed} outliers from measurement set");
    (filtered, total_removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement_set::Measurement;
    use crate::units::Unit;

    #[test]
    fn removes_single_far_value() {
        let out = filter_outliers(&[10.0, 10.0, 10.0, 10.0, 1000.0], 5.0);
        assert_eq!(out.retained, vec![10.0, 10.0, 10.0, 10.0]);
        assert_eq!(out.removed, 1);
    }

    #[test]
    fn empty_input() {
        let out = filter_outliers(&[], 5.0);
        assert!(out.retained.is_empty());
        assert_eq!(out.removed, 0);
        assert_eq!(
            filter_outliers_nonempty(&[], 5.0),
            Err(RangingError::EmptyInput)
        );
        assert_eq!(median(&[]), Err(RangingError::EmptyInput));
    }

    #[test]
    fn identical_values_are_all_kept() {
        let out = filter_outliers(&[3.5; 7], 0.5);
        assert_eq!(out.retained.len(), 7);
        assert_eq!(out.removed, 0);
    }

    #[test]
    fn order_is_preserved() {
        let out = filter_outliers(&[5.0, 1.0, 200.0, 3.0, 4.0, 2.0], 10.0);
        assert_eq!(out.retained, vec![5.0, 1.0, 3.0, 4.0, 2.0]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let data = [
            101.0, 99.5, 100.2, 180.0, 98.7, 100.9, 20.0, 100.1, 99.9, 101.4,
        ];
        let once = filter_outliers(&data, 5.0);
        let twice = filter_outliers(&once.retained, 5.0);
        assert_eq!(once.retained, twice.retained);
        assert_eq!(twice.removed, 0);
    }

    #[test]
    fn threshold_is_strict() {
        // median 10, value 15 is exactly at the threshold
        let out = filter_outliers(&[10.0, 10.0, 15.0], 5.0);
        assert_eq!(out.retained, vec![10.0, 10.0]);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Ok(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Ok(2.5));
        assert_eq!(median(&[42.0]), Ok(42.0));
    }

    #[test]
    fn filters_each_pair_of_a_set() {
        let mut set = MeasurementSet::new(Unit::Centimeters);
        for d in [120.0, 121.0, 119.0, 900.0] {
            set.push((1, 2), Measurement::new(4, d));
        }
        for d in [50.0, 52.0] {
            set.push((2, 1), Measurement::new(4, d));
        }
        let (filtered, removed) = filter_measurement_set(&set, 50.0);
        assert_eq!(removed, 1);
        assert_eq!(filtered.series(&(1, 2)).map(|s| s.len()), Some(3));
        assert_eq!(filtered.series(&(2, 1)).map(|s| s.len()), Some(2));
        assert_eq!(filtered.unit(), Unit::Centimeters);
    }
}
