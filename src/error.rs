//! Errors raised by the ranging core: timestamp arithmetic, the DS-TWR
//! estimators, outlier filtering and the statistics built on top of them.

use std::{error::Error, fmt};

/// Everything that can go wrong while turning raw radio timestamps into
/// distances and summary statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingError {
    /// A raw timestamp did not fit into the 40-bit radio clock.
    InvalidTimestamp(u64),

    /// The exchange intervals sum to zero, so no distance can be derived.
    /// Callers should discard the exchange.
    DegenerateExchange,

    /// A median, filter or statistic was requested on an empty sequence.
    EmptyInput,

    /// A confidence level outside the open interval (0, 1).
    InvalidConfidence,

    /// A quantile was requested for a probability outside (0, 1).
    InvalidProbability,
}

impl fmt::Display for RangingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangingError::InvalidTimestamp(raw) => {
                write!(f, "timestamp {raw:#x} does not fit the 40-bit radio clock")
            }
            RangingError::DegenerateExchange => {
                write!(f, "degenerate exchange: all ranging intervals are zero")
            }
            RangingError::EmptyInput => write!(f, "empty input sequence"),
            RangingError::InvalidConfidence => {
                write!(f, "confidence level must lie strictly between 0 and 1")
            }
            RangingError::InvalidProbability => {
                write!(f, "probability must lie strictly between 0 and 1")
            }
        }
    }
}

impl Error for RangingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_the_raw_value() {
        let msg = RangingError::InvalidTimestamp(0x1_0000_0000_00).to_string();
        assert!(msg.contains("0x10000000000"));
    }
}
