//! Evaluation settings, read from an optional RON file. Every field has a
//! default, so a file only needs to name what it changes:
//!
//! ```text
//! (
//!     threshold: 30.0,
//!     confidence: 0.99,
//!     parameter_step: Some(0.01),
//!     positions: {215: (x: 23.31, y: 0.26, z: 7.55), 206: (x: 24.51, y: 0.26, z: 8.96)},
//! )
//! ```
//!
//! Command line flags override whatever the file says.

use crate::aggregation::Position;
use crate::collector::CollectorSettings;
use crate::measurement_set::{read_ron_path, NodeId, PersistError};
use crate::ranging::Estimator;
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::{borrow::Cow, collections::BTreeMap, fmt, path::Path};

/// Parameters of collection and evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Outlier threshold: values at least this far from their series median
    /// are dropped. Expressed in `range_unit`.
    pub threshold: f64,
    /// Confidence level of the reported intervals.
    pub confidence: f64,
    /// Pairs with fewer measurements than this are left out of reports.
    pub min_count: usize,
    /// Unit the nodes print their ranges in, after scaling.
    pub range_unit: Unit,
    /// Divisor applied to reported ranges.
    pub range_scale: f64,
    /// Estimator for raw timestamp dumps.
    pub estimator: Estimator,
    /// Fixed true distance for single-pair experiments, in `range_unit`.
    pub ground_truth: Option<f64>,
    /// Surveyed node positions in meters, for per-pair ground truth.
    pub positions: BTreeMap<NodeId, Position>,
    /// Number of recent ranges averaged in the live view.
    pub window: usize,
    /// Length of one parameter step in seconds, when the parameter counts
    /// time (the ASN in scheduling experiments). Enables measurement rates.
    pub parameter_step: Option<f64>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        EvaluationConfig {
            threshold: 50.0,
            confidence: 0.95,
            min_count: 0,
            range_unit: Unit::Centimeters,
            range_scale: 1.0,
            estimator: Estimator::default(),
            ground_truth: None,
            positions: BTreeMap::new(),
            window: 5,
            parameter_step: None,
        }
    }
}

/// Returned when a configuration file cannot be loaded or makes no sense.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    PersistError(PersistError),
    /// A field holds a value outside its domain.
    InvalidValue {
        /// Field name
        field: &'static str,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::PersistError(e) => Cow::from(format!("could not load config: {e}")),
            ConfigError::InvalidValue { field, reason } => {
                Cow::from(format!("invalid `{field}`: {reason}"))
            }
        };
        write!(f, "{msg}")
    }
}

impl std::error::Error for ConfigError {}

impl From<PersistError> for ConfigError {
    fn from(value: PersistError) -> Self {
        Self::PersistError(value)
    }
}

impl EvaluationConfig {
    /// Loads and validates a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: EvaluationConfig = read_ron_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its domain.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason| Err(ConfigError::InvalidValue { field, reason });

        if self.threshold.is_nan() || self.threshold <= 0.0 {
            return invalid("threshold", "must be positive");
        }
        if self.confidence.is_nan() || self.confidence <= 0.0 || self.confidence >= 1.0 {
            return invalid("confidence", "must lie strictly between 0 and 1");
        }
        if self.range_scale == 0.0 || !self.range_scale.is_finite() {
            return invalid("range_scale", "must be finite and non-zero");
        }
        if self.window == 0 {
            return invalid("window", "must be at least 1");
        }
        if let Some(step) = self.parameter_step {
            if !(step.is_finite() && step > 0.0) {
                return invalid("parameter_step", "must be positive");
            }
        }
        Ok(())
    }

    /// How a collector should interpret incoming ranges.
    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings {
            range_unit: self.range_unit,
            range_scale: self.range_scale,
            estimator: self.estimator,
        }
    }

    /// The true distance between `a` and `b` in `range_unit`, from the
    /// surveyed positions if both are known, else the fixed ground truth.
    pub fn ground_truth_for(&self, a: NodeId, b: NodeId) -> Option<f64> {
        match (self.positions.get(&a), self.positions.get(&b)) {
            (Some(pa), Some(pb)) => {
                Some(pa.distance_to(pb) * Unit::Meters.factor_to(self.range_unit))
            }
            _ => self.ground_truth,
        }
    }
}
