//! Summary statistics over filtered measurement series.
//!
//! Nothing in here filters: callers run [`crate::outlier::filter_outliers`]
//! first so the two steps can be checked independently.

use crate::error::RangingError;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64, RangingError> {
    if values.is_empty() {
        return Err(RangingError::EmptyInput);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n − 1 denominator). A single value has zero variance.
pub fn variance(values: &[f64]) -> Result<f64, RangingError> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Ok(0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Ok(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Result<f64, RangingError> {
    variance(values).map(f64::sqrt)
}

fn check_probability(p: f64) -> Result<(), RangingError> {
    if p > 0.0 && p < 1.0 {
        Ok(())
    } else {
        Err(RangingError::InvalidProbability)
    }
}

/// Quantile of the standard normal distribution.
pub fn normal_quantile(p: f64) -> Result<f64, RangingError> {
    check_probability(p)?;
    let normal = Normal::new(0.0, 1.0).map_err(|_| RangingError::InvalidProbability)?;
    Ok(normal.inverse_cdf(p))
}

/// Quantile of Student's t distribution with `dof` degrees of freedom.
/// Zero degrees of freedom means there was nothing to estimate a spread
/// from, and is reported as [`RangingError::EmptyInput`].
pub fn student_t_quantile(p: f64, dof: u32) -> Result<f64, RangingError> {
    check_probability(p)?;
    let t = StudentsT::new(0.0, 1.0, dof as f64).map_err(|_| RangingError::EmptyInput)?;
    Ok(t.inverse_cdf(p))
}

/// Mean, spread and a two-sided confidence interval for one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of values summarised.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Lower confidence bound on the mean.
    pub ci_low: f64,
    /// Upper confidence bound on the mean.
    pub ci_high: f64,
}

impl Summary {
    /// Half the width of the confidence interval.
    pub fn half_width(&self) -> f64 {
        (self.ci_high - self.ci_low) / 2.0
    }
}

/// Summarises `values` with a Student-t confidence interval at level
/// `confidence` (e.g. `0.95`), which must lie strictly between 0 and 1.
pub fn summarize(values: &[f64], confidence: f64) -> Result<Summary, RangingError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(RangingError::InvalidConfidence);
    }
    let m = mean(values)?;
    let s = std_dev(values)?;
    let n = values.len();

    let half_width = if n < 2 {
        0.0
    } else {
        let t = student_t_quantile((1.0 + confidence) / 2.0, (n - 1) as u32)?;
        t * s / (n as f64).sqrt()
    };

    Ok(Summary {
        count: n,
        mean: m,
        std_dev: s,
        ci_low: m - half_width,
        ci_high: m + half_width,
    })
}

/// Trailing moving average: element `i` is the mean of the last `window`
/// values up to and including `i` (fewer at the start of the series).
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(values.len());
    let mut running = 0.0;
    for (i, v) in values.iter().enumerate() {
        running += v;
        if i >= window {
            running -= values[i - window];
        }
        let len = (i + 1).min(window);
        out.push(running / len as f64);
    }
    out
}
