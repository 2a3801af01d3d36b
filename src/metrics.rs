//! Scalar reductions over numeric sequences
//!
//! - [`mean_squared_error`]: numeric vs. analytic comparison
//! - [`mean`] / [`population_std`]: ensemble statistics (`ddof = 0`)
//! - [`EnergyDrift`]: relative total-energy error against the first sample

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean of squared pointwise differences.
///
/// Exactly zero for self-comparison and symmetric in its arguments.
///
/// # Errors
///
/// - [`Error::LengthMismatch`] if the sequences differ in length
/// - [`Error::EmptyInput`] if both are empty
///
/// # Example
///
/// ```rust
/// use simtrace::metrics::mean_squared_error;
///
/// let mse = mean_squared_error(&[1.0, 2.0, 3.0], &[1.0, 2.0, 5.0])?;
/// assert!((mse - 4.0 / 3.0).abs() < 1e-15);
/// # Ok::<(), simtrace::Error>(())
/// ```
#[allow(clippy::cast_precision_loss)]
pub fn mean_squared_error(numeric: &[f64], analytic: &[f64]) -> Result<f64> {
    if numeric.len() != analytic.len() {
        return Err(Error::LengthMismatch {
            context: "mean squared error".to_string(),
            left: numeric.len(),
            right: analytic.len(),
        });
    }
    if numeric.is_empty() {
        return Err(Error::EmptyInput("mean squared error of no samples".to_string()));
    }

    let sum: f64 = numeric
        .iter()
        .zip(analytic)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum();
    Ok(sum / numeric.len() as f64)
}

/// Arithmetic mean.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Result<f64> {
    let Some(&first) = values.first() else {
        return Err(Error::EmptyInput("mean of no values".to_string()));
    };
    // Shifted by the first value: exact when all values are equal.
    let shift = values.iter().map(|v| v - first).sum::<f64>() / values.len() as f64;
    Ok(first + shift)
}

/// Population standard deviation (divides by `n`, not `n - 1`).
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for an empty slice.
#[allow(clippy::cast_precision_loss)]
pub fn population_std(values: &[f64]) -> Result<f64> {
    let m = mean(values)?;
    let var = values
        .iter()
        .map(|v| {
            let d = v - m;
            d * d
        })
        .sum::<f64>()
        / values.len() as f64;
    Ok(var.sqrt())
}

/// Relative total-energy error `|E(t) - E(0)| / |E(0)|` reduced over time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyDrift {
    /// Mean relative error over all samples
    pub mean: f64,
    /// Population standard deviation of the relative error
    pub std: f64,
    /// Largest relative error
    pub max: f64,
}

impl EnergyDrift {
    /// Compute drift statistics for a total-energy series.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`] for an empty series
    /// - [`Error::InvalidParameter`] if any total is not finite (a diverged
    ///   run) or `E(0)` is zero
    pub fn from_totals(totals: &[f64]) -> Result<Self> {
        let Some(&e0) = totals.first() else {
            return Err(Error::EmptyInput("energy drift of an empty series".to_string()));
        };
        if let Some(i) = totals.iter().position(|e| !e.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "total energy at sample {i} is {}, run diverged",
                totals[i]
            )));
        }
        if e0 == 0.0 {
            return Err(Error::InvalidParameter(format!(
                "relative energy error needs a non-zero E(0), got {e0}"
            )));
        }

        let errors: Vec<f64> = totals.iter().map(|e| (e - e0).abs() / e0.abs()).collect();
        Ok(Self {
            mean: mean(&errors)?,
            std: population_std(&errors)?,
            max: errors.iter().copied().fold(0.0, f64::max),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mse_self_is_zero() {
        let a = [0.3, -1.7, 2.0e9, 1.0e-12];
        assert_eq!(mean_squared_error(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_mse_symmetric() {
        let a = [1.0, 2.0, 3.5];
        let b = [0.5, 2.25, -1.0];
        assert_eq!(
            mean_squared_error(&a, &b).unwrap(),
            mean_squared_error(&b, &a).unwrap()
        );
    }

    #[test]
    fn test_mse_length_mismatch() {
        let err = mean_squared_error(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { left: 2, right: 1, .. }));
    }

    #[test]
    fn test_mse_empty() {
        assert!(matches!(mean_squared_error(&[], &[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_population_std() {
        // Classic example: population std of 2,4,4,4,5,5,7,9 is 2.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-15);
        assert!((population_std(&values).unwrap() - 2.0).abs() < 1e-15);
    }

    #[test]
    fn test_std_of_constant_is_zero() {
        assert_eq!(population_std(&[0.1, 0.1]).unwrap(), 0.0);
        assert_eq!(population_std(&[0.1, 0.1, 0.1]).unwrap(), 0.0);
        assert_eq!(mean(&[0.1, 0.1, 0.1]).unwrap(), 0.1);
    }

    #[test]
    fn test_energy_drift() {
        let drift = EnergyDrift::from_totals(&[-2.0, -2.2, -1.9, -2.0]).unwrap();
        assert!((drift.max - 0.1).abs() < 1e-12);
        assert!((drift.mean - 0.0375).abs() < 1e-12);
        assert!(drift.std > 0.0);
    }

    #[test]
    fn test_energy_drift_rejects_zero_reference() {
        assert!(matches!(
            EnergyDrift::from_totals(&[0.0, 1.0]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(EnergyDrift::from_totals(&[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_energy_drift_rejects_diverged_run() {
        let err = EnergyDrift::from_totals(&[-2.0, -2.01, f64::NAN, -2.0]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(format!("{err}").contains("sample 2"));

        assert!(EnergyDrift::from_totals(&[-2.0, f64::INFINITY]).is_err());
        assert!(EnergyDrift::from_totals(&[f64::NAN, -2.0]).is_err());
    }
}
