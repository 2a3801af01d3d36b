//! Cross-run aggregation of repeated simulations
//!
//! Runs at one sweep point (same N, same step size, different random initial
//! conditions) are stacked on their shared time grid. The result is the
//! per-timestep mean and population std, plus a trend line fitted over the
//! stationary range (`time >= transient_cutoff`).
//!
//! Every run must carry exactly the same time grid. Runs from different
//! simulation configurations would otherwise be averaged sample-by-sample.

use serde::{Deserialize, Serialize};

use crate::config::TrendConfig;
use crate::metrics::{mean, population_std};
use crate::trend::{LinearFit, TrendStrategy};
use crate::{Error, Result};

/// A scalar observable sampled over time for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TimeSeriesParts")]
pub struct TimeSeries {
    times: Vec<f64>,
    values: Vec<f64>,
}

/// Unchecked serialized form, validated through [`TimeSeries::new`].
#[derive(Deserialize)]
struct TimeSeriesParts {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl TryFrom<TimeSeriesParts> for TimeSeries {
    type Error = Error;

    fn try_from(parts: TimeSeriesParts) -> Result<Self> {
        Self::new(parts.times, parts.values)
    }
}

impl TimeSeries {
    /// Pair up times and values. Times must be finite and strictly ascending.
    ///
    /// # Errors
    ///
    /// - [`Error::LengthMismatch`] if the lengths differ
    /// - [`Error::InvalidParameter`] for a non-finite or out-of-order time
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if times.len() != values.len() {
            return Err(Error::LengthMismatch {
                context: "time series".to_string(),
                left: times.len(),
                right: values.len(),
            });
        }
        if let Some(i) = times.iter().position(|t| !t.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "time series sample {i} has time {}",
                times[i]
            )));
        }
        if let Some(i) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::InvalidParameter(format!(
                "time series times must be strictly ascending: t[{}] = {} follows t[{i}] = {}",
                i + 1,
                times[i + 1],
                times[i]
            )));
        }
        Ok(Self { times, values })
    }

    /// Sample times
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Sample values
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if there are no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Index of the first sample with `time >= cutoff`.
    #[must_use]
    pub fn stationary_start(&self, cutoff: f64) -> usize {
        self.times.partition_point(|&t| t < cutoff)
    }
}

/// Mean/std curves and stationary-range trend of an ensemble of runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSummary {
    /// Shared time grid
    pub times: Vec<f64>,
    /// Per-timestep mean across runs
    pub mean: Vec<f64>,
    /// Per-timestep population std across runs
    pub std: Vec<f64>,
    /// Index of the first stationary sample
    pub stationary_start: usize,
    /// Trend line fitted to the mean curve
    pub fit: LinearFit,
    /// Population std of the slopes fitted to each run individually
    pub slope_std: f64,
    /// Number of runs stacked
    pub run_count: usize,
}

impl EnsembleSummary {
    /// Trend slope of the mean curve
    #[must_use]
    pub const fn slope(&self) -> f64 {
        self.fit.slope
    }

    /// Stationary part of the time grid
    #[must_use]
    pub fn stationary_times(&self) -> &[f64] {
        &self.times[self.stationary_start..]
    }

    /// Stationary part of the mean curve
    #[must_use]
    pub fn stationary_mean(&self) -> &[f64] {
        &self.mean[self.stationary_start..]
    }

    /// Stationary part of the std curve
    #[must_use]
    pub fn stationary_std(&self) -> &[f64] {
        &self.std[self.stationary_start..]
    }

    /// Largest `mean + std` over the whole grid.
    #[must_use]
    pub fn envelope_max(&self) -> f64 {
        self.mean
            .iter()
            .zip(&self.std)
            .map(|(m, s)| m + s)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Stacks runs and fits the stationary trend.
pub struct EnsembleAggregator {
    transient_cutoff: f64,
    strategy: Box<dyn TrendStrategy>,
}

impl std::fmt::Debug for EnsembleAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleAggregator")
            .field("transient_cutoff", &self.transient_cutoff)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

impl EnsembleAggregator {
    /// Create an aggregator with an explicit strategy.
    #[must_use]
    pub fn new(transient_cutoff: f64, strategy: Box<dyn TrendStrategy>) -> Self {
        Self {
            transient_cutoff,
            strategy,
        }
    }

    /// Create an aggregator from trend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for a non-finite cutoff or an
    /// invalid strategy.
    pub fn from_config(config: &TrendConfig) -> Result<Self> {
        if !config.transient_cutoff.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "transient cutoff must be finite, got {}",
                config.transient_cutoff
            )));
        }
        Ok(Self::new(config.transient_cutoff, config.strategy.strategy()?))
    }

    /// Name of the trend strategy in use
    #[must_use]
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Aggregate runs that share one time grid.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyInput`] if `runs` is empty or the stationary range
    ///   has fewer than two samples
    /// - [`Error::TimeGridMismatch`] if any run's times differ from the
    ///   first run's, in length or in any element
    /// - [`Error::InvalidParameter`] if any value is NaN or infinite
    pub fn aggregate(&self, runs: &[TimeSeries]) -> Result<EnsembleSummary> {
        let reference = runs
            .first()
            .ok_or_else(|| Error::EmptyInput("no runs to aggregate".to_string()))?;
        if reference.is_empty() {
            return Err(Error::EmptyInput("runs have no samples".to_string()));
        }
        check_time_grids(runs)?;
        check_finite_values(runs)?;

        let times = reference.times.clone();
        let mut mean_curve = Vec::with_capacity(times.len());
        let mut std_curve = Vec::with_capacity(times.len());
        let mut column = Vec::with_capacity(runs.len());
        for i in 0..times.len() {
            column.clear();
            column.extend(runs.iter().map(|run| run.values[i]));
            mean_curve.push(mean(&column)?);
            std_curve.push(population_std(&column)?);
        }

        let start = reference.stationary_start(self.transient_cutoff);
        let fit = self
            .strategy
            .fit(&times[start..], &mean_curve[start..])?;

        let slopes = runs
            .iter()
            .map(|run| {
                self.strategy
                    .fit(&run.times[start..], &run.values[start..])
                    .map(|f| f.slope)
            })
            .collect::<Result<Vec<f64>>>()?;

        Ok(EnsembleSummary {
            times,
            mean: mean_curve,
            std: std_curve,
            stationary_start: start,
            fit,
            slope_std: population_std(&slopes)?,
            run_count: runs.len(),
        })
    }
}

/// Verify that every run has exactly the first run's time grid.
///
/// # Errors
///
/// Returns [`Error::TimeGridMismatch`] naming the first offending run.
#[allow(clippy::float_cmp)]
pub fn check_time_grids(runs: &[TimeSeries]) -> Result<()> {
    let Some(reference) = runs.first() else {
        return Ok(());
    };
    for (run, series) in runs.iter().enumerate().skip(1) {
        if series.times.len() != reference.times.len() {
            return Err(Error::TimeGridMismatch {
                run,
                reason: format!(
                    "{} samples, run 0 has {}",
                    series.times.len(),
                    reference.times.len()
                ),
            });
        }
        if let Some(i) = series
            .times
            .iter()
            .zip(&reference.times)
            .position(|(a, b)| a != b)
        {
            return Err(Error::TimeGridMismatch {
                run,
                reason: format!(
                    "sample {i} at t = {}, run 0 has t = {}",
                    series.times[i], reference.times[i]
                ),
            });
        }
    }
    Ok(())
}

/// Reject runs carrying NaN or infinite values.
fn check_finite_values(runs: &[TimeSeries]) -> Result<()> {
    for (run, series) in runs.iter().enumerate() {
        if let Some(i) = series.values.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "run {run}, sample {i} (t = {}) has value {}",
                series.times[i], series.values[i]
            )));
        }
    }
    Ok(())
}

/// Largest `mean + std` across several summaries, for a shared plot scale.
#[must_use]
pub fn common_envelope_max<'a>(summaries: impl IntoIterator<Item = &'a EnsembleSummary>) -> Option<f64> {
    summaries
        .into_iter()
        .map(EnsembleSummary::envelope_max)
        .reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::{FullRangeTrendStrategy, TailFractionTrendStrategy, TrendVariant};

    fn grid(n: u32) -> Vec<f64> {
        (0..n).map(|i| f64::from(i) * 0.1).collect()
    }

    fn series(values: impl Fn(f64) -> f64, n: u32) -> TimeSeries {
        let times = grid(n);
        let values = times.iter().map(|&t| values(t)).collect();
        TimeSeries::new(times, values).unwrap()
    }

    fn full_range(cutoff: f64) -> EnsembleAggregator {
        EnsembleAggregator::new(cutoff, Box::new(FullRangeTrendStrategy))
    }

    #[test]
    fn test_identical_constant_runs_have_zero_std() {
        let runs = vec![series(|_| 1.7, 20), series(|_| 1.7, 20)];
        let summary = full_range(0.5).aggregate(&runs).unwrap();
        assert!(summary.std.iter().all(|&s| s == 0.0));
        assert!(summary.mean.iter().all(|&m| m == 1.7));
        assert_eq!(summary.slope_std, 0.0);
        assert_eq!(summary.run_count, 2);
    }

    #[test]
    fn test_mean_and_std_across_runs() {
        let runs = vec![series(|t| t, 10), series(|t| t + 2.0, 10)];
        let summary = full_range(0.0).aggregate(&runs).unwrap();
        for (i, &t) in summary.times.iter().enumerate() {
            assert!((summary.mean[i] - (t + 1.0)).abs() < 1e-12);
            assert!((summary.std[i] - 1.0).abs() < 1e-12);
        }
        assert!((summary.slope() - 1.0).abs() < 1e-9);
        assert!(summary.slope_std.abs() < 1e-9);
    }

    #[test]
    fn test_slope_std_from_individual_runs() {
        let runs = vec![series(|t| 2.0 * t, 11), series(|_| 0.0, 11)];
        let summary = full_range(0.0).aggregate(&runs).unwrap();
        assert!((summary.slope() - 1.0).abs() < 1e-9);
        assert!((summary.slope_std - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stationary_range_excludes_transient() {
        // Steep transient followed by a flat plateau.
        let runs = vec![series(|t| if t < 0.5 { 10.0 * t } else { 5.0 }, 20)];
        let summary = full_range(0.5).aggregate(&runs).unwrap();
        assert_eq!(summary.stationary_start, 5);
        assert!(summary.slope().abs() < 1e-9);
        assert_eq!(summary.stationary_times().len(), 15);
        assert_eq!(summary.stationary_mean().len(), 15);
        assert_eq!(summary.stationary_std().len(), 15);
    }

    #[test]
    fn test_tail_fraction_strategy() {
        let runs = vec![series(|t| if t < 1.0 { 0.0 } else { t }, 20)];
        let tail = EnsembleAggregator::new(
            0.0,
            Box::new(TailFractionTrendStrategy::new(0.5).unwrap()),
        );
        let summary = tail.aggregate(&runs).unwrap();
        assert!((summary.slope() - 1.0).abs() < 1e-9);
        assert_eq!(tail.strategy_name(), "tail_fraction");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(full_range(0.0).aggregate(&[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_rejects_grid_length_mismatch() {
        let runs = vec![series(|t| t, 10), series(|t| t, 11)];
        let err = full_range(0.0).aggregate(&runs).unwrap_err();
        assert!(matches!(err, Error::TimeGridMismatch { run: 1, .. }));
    }

    #[test]
    fn test_rejects_grid_value_mismatch() {
        let a = series(|t| t, 10);
        let mut times = a.times().to_vec();
        times[7] += 1e-9;
        let b = TimeSeries::new(times, a.values().to_vec()).unwrap();
        let err = full_range(0.0).aggregate(&[a, b]).unwrap_err();
        assert!(format!("{err}").contains("sample 7"));
    }

    #[test]
    fn test_time_series_rejects_unordered_times() {
        let err = TimeSeries::new(vec![0.6, 0.0, 0.7, 0.8], vec![1.0; 4]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(format!("{err}").contains("t[1]"));

        // Repeated sample times are not a grid either
        assert!(TimeSeries::new(vec![0.0, 0.1, 0.1], vec![1.0; 3]).is_err());
        assert!(TimeSeries::new(vec![0.0, f64::NAN], vec![1.0; 2]).is_err());
    }

    #[test]
    fn test_rejects_non_finite_values() {
        let good = series(|t| t, 10);
        let mut values = good.values().to_vec();
        values[8] = f64::NAN;
        let bad = TimeSeries::new(good.times().to_vec(), values).unwrap();

        let err = full_range(0.0).aggregate(&[good.clone(), bad]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        let message = format!("{err}");
        assert!(message.contains("run 1"));
        assert!(message.contains("sample 8"));

        let mut values = good.values().to_vec();
        values[0] = f64::INFINITY;
        let inf = TimeSeries::new(good.times().to_vec(), values).unwrap();
        assert!(full_range(0.0).aggregate(&[inf]).is_err());
    }

    #[test]
    fn test_short_stationary_range() {
        let runs = vec![series(|t| t, 10)];
        assert!(matches!(
            full_range(100.0).aggregate(&runs),
            Err(Error::EmptyInput(_))
        ));
    }

    #[test]
    fn test_from_config() {
        let config = TrendConfig {
            transient_cutoff: 0.2,
            strategy: TrendVariant::TailFraction { frac_tail: 0.5 },
        };
        let aggregator = EnsembleAggregator::from_config(&config).unwrap();
        assert_eq!(aggregator.strategy_name(), "tail_fraction");

        let bad = TrendConfig {
            transient_cutoff: f64::NAN,
            ..config
        };
        assert!(EnsembleAggregator::from_config(&bad).is_err());
    }

    #[test]
    fn test_envelope() {
        let runs = vec![series(|t| t, 10), series(|t| t + 2.0, 10)];
        let a = full_range(0.0).aggregate(&runs).unwrap();
        let b = full_range(0.0).aggregate(&runs[..1]).unwrap();
        // max mean 0.9 + 1.0, std 1.0
        assert!((a.envelope_max() - 2.9).abs() < 1e-12);
        assert!((common_envelope_max([&a, &b]).unwrap() - 2.9).abs() < 1e-12);
        assert!(common_envelope_max(std::iter::empty()).is_none());
    }
}
