//! Linear trend fitting
//!
//! Two strategies decide which part of a stationary range the least-squares
//! line is fitted to:
//!
//! - [`FullRangeTrendStrategy`]: every stationary sample
//! - [`TailFractionTrendStrategy`]: only the trailing `frac_tail` of the
//!   stationary samples
//!
//! Neither supersedes the other; [`TrendVariant`] selects one from config.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Least-squares line `y = slope * t + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    /// Slope of the fitted line
    pub slope: f64,
    /// Intercept at `t = 0`
    pub intercept: f64,
}

impl LinearFit {
    /// Evaluate the line at `t`.
    #[must_use]
    pub fn at(&self, t: f64) -> f64 {
        self.slope.mul_add(t, self.intercept)
    }
}

/// Fit a degree-1 polynomial by ordinary least squares.
///
/// # Errors
///
/// - [`Error::LengthMismatch`] if `times` and `values` differ in length
/// - [`Error::EmptyInput`] with fewer than two samples
/// - [`Error::InvalidParameter`] if all times are identical
#[allow(clippy::cast_precision_loss)]
pub fn fit_line(times: &[f64], values: &[f64]) -> Result<LinearFit> {
    if times.len() != values.len() {
        return Err(Error::LengthMismatch {
            context: "linear fit".to_string(),
            left: times.len(),
            right: values.len(),
        });
    }
    if times.len() < 2 {
        return Err(Error::EmptyInput(format!(
            "linear fit needs at least two samples, got {}",
            times.len()
        )));
    }

    let n = times.len() as f64;
    let t_mean = times.iter().sum::<f64>() / n;
    let y_mean = values.iter().sum::<f64>() / n;

    let (sxy, sxx) = times
        .iter()
        .zip(values)
        .fold((0.0, 0.0), |(sxy, sxx), (&t, &y)| {
            let dt = t - t_mean;
            (dt.mul_add(y - y_mean, sxy), dt.mul_add(dt, sxx))
        });

    if sxx == 0.0 {
        return Err(Error::InvalidParameter(
            "linear fit over samples that all share one time".to_string(),
        ));
    }

    let slope = sxy / sxx;
    Ok(LinearFit {
        slope,
        intercept: slope.mul_add(-t_mean, y_mean),
    })
}

/// Chooses the window of a stationary series that a trend line is fitted to.
pub trait TrendStrategy {
    /// Short name for logs and reports
    fn name(&self) -> &'static str;

    /// Index of the first stationary sample that takes part in the fit.
    fn window_start(&self, len: usize) -> usize;

    /// Fit a line to the strategy's window of `(times, values)`.
    ///
    /// # Errors
    ///
    /// Propagates [`fit_line`] errors for the selected window.
    fn fit(&self, times: &[f64], values: &[f64]) -> Result<LinearFit> {
        if times.len() != values.len() {
            return Err(Error::LengthMismatch {
                context: format!("{} trend window", self.name()),
                left: times.len(),
                right: values.len(),
            });
        }
        let start = self.window_start(times.len());
        fit_line(&times[start..], &values[start..])
    }
}

/// Fit over the whole stationary range.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullRangeTrendStrategy;

impl TrendStrategy for FullRangeTrendStrategy {
    fn name(&self) -> &'static str {
        "full_range"
    }

    fn window_start(&self, _len: usize) -> usize {
        0
    }
}

/// Fit over the trailing fraction of the stationary range.
#[derive(Debug, Clone, Copy)]
pub struct TailFractionTrendStrategy {
    frac_tail: f64,
}

impl TailFractionTrendStrategy {
    /// Create a tail strategy keeping the last `frac_tail` of the samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] unless `0 < frac_tail <= 1`.
    pub fn new(frac_tail: f64) -> Result<Self> {
        if !(frac_tail > 0.0 && frac_tail <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "frac_tail must lie in (0, 1], got {frac_tail}"
            )));
        }
        Ok(Self { frac_tail })
    }

    /// Fraction of the stationary range kept for the fit
    #[must_use]
    pub const fn frac_tail(&self) -> f64 {
        self.frac_tail
    }
}

impl TrendStrategy for TailFractionTrendStrategy {
    fn name(&self) -> &'static str {
        "tail_fraction"
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn window_start(&self, len: usize) -> usize {
        // Truncation toward zero, as int(n * (1 - frac)).
        let start = (len as f64 * (1.0 - self.frac_tail)) as usize;
        start.min(len)
    }
}

/// Configurable selection between the two strategies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrendVariant {
    /// [`FullRangeTrendStrategy`]
    FullRange,
    /// [`TailFractionTrendStrategy`]
    TailFraction {
        /// Trailing fraction of the stationary range
        frac_tail: f64,
    },
}

impl TrendVariant {
    /// Build the strategy this variant names.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for an out-of-range `frac_tail`.
    pub fn strategy(&self) -> Result<Box<dyn TrendStrategy>> {
        Ok(match *self {
            Self::FullRange => Box::new(FullRangeTrendStrategy),
            Self::TailFraction { frac_tail } => Box::new(TailFractionTrendStrategy::new(frac_tail)?),
        })
    }
}
