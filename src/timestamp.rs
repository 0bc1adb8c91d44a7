//! The DW1000 radio keeps time with a free-running 40-bit counter that wraps
//! roughly every 17 seconds. [`Timestamp`] guards that range, and
//! [`overflow_corrected_diff`] measures elapsed ticks across a wrap.

use crate::error::RangingError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of bits in a radio timestamp.
pub const TIMESTAMP_BITS: u32 = 40;

/// Largest value the radio clock can hold before wrapping to zero.
pub const TIMESTAMP_MAX: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Length of one full clock period, in ticks.
const CLOCK_PERIOD: u64 = TIMESTAMP_MAX + 1;

/// A validated 40-bit radio timestamp, in device time units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Timestamp(u64);

impl Timestamp {
    /// Wraps a raw counter value, rejecting anything wider than 40 bits.
    pub fn new(raw: u64) -> Result<Self, RangingError> {
        if raw > TIMESTAMP_MAX {
            Err(RangingError::InvalidTimestamp(raw))
        } else {
            Ok(Timestamp(raw))
        }
    }

    /// The raw counter value.
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// Ticks elapsed from `earlier` to `self`, assuming the clock wrapped at
    /// most once in between.
    pub fn elapsed_since(self, earlier: Timestamp) -> u64 {
        if self.0 < earlier.0 {
            (CLOCK_PERIOD - earlier.0) + self.0
        } else {
            self.0 - earlier.0
        }
    }
}

impl TryFrom<u64> for Timestamp {
    type Error = RangingError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Timestamp::new(raw)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> u64 {
        ts.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#012x}", self.0)
    }
}

/// Returns the true, non-negative number of ticks between an earlier event
/// `low` and a later event `high`.
///
/// If `high < low` the clock wrapped between the two events. Only a single
/// wrap can be detected; longer intervals come back silently short by a
/// multiple of the clock period.
pub fn overflow_corrected_diff(high: u64, low: u64) -> Result<u64, RangingError> {
    let high = Timestamp::new(high)?;
    let low = Timestamp::new(low)?;
    Ok(high.elapsed_since(low))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn no_wraparound() {
        assert_eq!(overflow_corrected_diff(100, 50), Ok(50));
    }

    #[test]
    fn wraparound_counts_the_wrap_tick() {
        assert_eq!(overflow_corrected_diff(50, TIMESTAMP_MAX), Ok(51));
        assert_eq!(overflow_corrected_diff(0, TIMESTAMP_MAX), Ok(1));
    }

    #[test]
    fn equal_timestamps_are_zero_apart() {
        assert_eq!(overflow_corrected_diff(TIMESTAMP_MAX, TIMESTAMP_MAX), Ok(0));
    }

    #[test]
    fn out_of_range_is_rejected() {
        assert_eq!(
            overflow_corrected_diff(TIMESTAMP_MAX + 1, 0),
            Err(RangingError::InvalidTimestamp(TIMESTAMP_MAX + 1))
        );
        assert_eq!(
            overflow_corrected_diff(0, u64::MAX),
            Err(RangingError::InvalidTimestamp(u64::MAX))
        );
    }

    #[test]
    fn random_pairs_stay_within_one_period() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let high = rng.gen_range(0..=TIMESTAMP_MAX);
            let low = rng.gen_range(0..=TIMESTAMP_MAX);
            let diff = overflow_corrected_diff(high, low).unwrap();
            assert!(diff <= TIMESTAMP_MAX);
            // adding the interval back onto `low` lands on `high` modulo the period
            assert_eq!((low + diff) % CLOCK_PERIOD, high);
        }
    }

    #[test]
    fn serde_rejects_wide_values() {
        let ok: Timestamp = ron::from_str("1234").unwrap();
        assert_eq!(ok.ticks(), 1234);
        assert!(ron::from_str::<Timestamp>("1099511627776").is_err());
    }
}
