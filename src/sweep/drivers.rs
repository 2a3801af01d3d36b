//! Sweep drivers - file-backed sweeps over integrators, step sizes and particle counts

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{SweepKey, SweepRecord, SweepRunner, SweepTable, TrendSweep};
use crate::config::{AnalysisConfig, OscillatorParams, TrendConfig};
use crate::ensemble::{EnsembleAggregator, TimeSeries};
use crate::metrics::EnergyDrift;
use crate::oscillator::{compare_trajectory, OscillatorMetric};
use crate::storage::{load_energy_records, load_oscillator_trajectory, load_particle_states};
use crate::timestep::half_mass_radius_series;
use crate::{Error, Result};

/// Which energy drift statistic a sweep records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatistic {
    /// Mean relative error, with its std as the record's uncertainty
    #[default]
    Mean,
    /// Maximum relative error
    Max,
}

/// Sweep key plus the file that holds its data.
struct FilePoint {
    key: SweepKey,
    path: PathBuf,
}

impl fmt::Display for FilePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.path.display())
    }
}

/// Sweep parameter plus the runs measured at it.
struct ParameterPoint<R> {
    parameter: f64,
    runs: Vec<R>,
}

impl<R> fmt::Display for ParameterPoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parameter={} ({} runs)", self.parameter, self.runs.len())
    }
}

fn file_points<P: AsRef<Path>>(points: impl IntoIterator<Item = (SweepKey, P)>) -> Vec<FilePoint> {
    points
        .into_iter()
        .map(|(key, path)| FilePoint {
            key,
            path: path.as_ref().to_path_buf(),
        })
        .collect()
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::InvalidParameter(format!("{what} is not finite: {value}")))
    }
}

fn collect_table(outcome: super::SweepOutcome<FilePoint, SweepRecord>) -> Result<SweepTable> {
    let mut table = SweepTable::new();
    for (_, record) in outcome.completed {
        table.add_record(record)?;
    }
    for failure in outcome.failures {
        table.add_failure(failure);
    }
    Ok(table)
}

/// Oscillator MSE for every `(integrator, step size)` trajectory file.
///
/// # Errors
///
/// Under [`super::FailurePolicy::Abort`], the first failing point as
/// [`Error::SweepPoint`] (bad file, overdamped parameters, non-finite MSE).
pub fn oscillator_error_sweep<P: AsRef<Path>>(
    params: &OscillatorParams,
    metric: OscillatorMetric,
    runner: &SweepRunner,
    points: impl IntoIterator<Item = (SweepKey, P)>,
) -> Result<SweepTable> {
    let outcome = runner.run(file_points(points), |point| {
        let trajectory = load_oscillator_trajectory(&point.path)?;
        let errors = compare_trajectory(&trajectory, params)?;
        let mse = finite(errors.get(metric), "mean squared error")?;
        Ok(SweepRecord::builder(point.key.clone(), mse).build())
    })?;
    collect_table(outcome)
}

/// Relative energy error for every `(integrator, step size)` energy file.
///
/// # Errors
///
/// Under [`super::FailurePolicy::Abort`], the first failing point as
/// [`Error::SweepPoint`] (bad file, empty series, zero initial energy).
pub fn energy_error_sweep<P: AsRef<Path>>(
    statistic: DriftStatistic,
    runner: &SweepRunner,
    points: impl IntoIterator<Item = (SweepKey, P)>,
) -> Result<SweepTable> {
    let outcome = runner.run(file_points(points), |point| {
        let totals: Vec<f64> = load_energy_records(&point.path)?
            .iter()
            .map(|r| r.total)
            .collect();
        let drift = EnergyDrift::from_totals(&totals)?;
        let record = match statistic {
            DriftStatistic::Mean => SweepRecord::builder(point.key.clone(), finite(drift.mean, "energy drift")?)
                .uncertainty(finite(drift.std, "energy drift std")?),
            DriftStatistic::Max => SweepRecord::builder(point.key.clone(), finite(drift.max, "energy drift")?),
        };
        Ok(record.build())
    })?;
    collect_table(outcome)
}

/// Walk the integrator's series from the smallest step up and return the
/// first record whose metric is strictly below `threshold`.
#[must_use]
pub fn best_step_size(table: &SweepTable, integrator: &str, threshold: f64) -> Option<SweepRecord> {
    table
        .series(integrator)
        .into_iter()
        .find(|record| record.metric() < threshold)
}

/// Aggregate each parameter's runs and fit its stationary trend.
///
/// # Errors
///
/// - [`Error::InvalidParameter`] for an invalid trend config
/// - under [`super::FailurePolicy::Abort`], the first failing point as
///   [`Error::SweepPoint`] (no runs, time grid mismatch, too few samples)
pub fn trend_sweep(
    config: &TrendConfig,
    runner: &SweepRunner,
    points: impl IntoIterator<Item = (f64, Vec<TimeSeries>)>,
) -> Result<TrendSweep> {
    let aggregator = EnsembleAggregator::from_config(config)?;
    let points: Vec<ParameterPoint<TimeSeries>> = points
        .into_iter()
        .map(|(parameter, runs)| ParameterPoint { parameter, runs })
        .collect();

    let outcome = runner.run(points, |point| aggregator.aggregate(&point.runs))?;
    Ok(TrendSweep::new(
        outcome
            .completed
            .into_iter()
            .map(|(point, summary)| (point.parameter, summary))
            .collect(),
        outcome.failures,
    ))
}

/// Half-mass radius trend per parameter, from particle-state files.
///
/// Each file is one run; it is reduced to its half-mass radius series before
/// the runs are stacked.
///
/// # Errors
///
/// Same as [`trend_sweep`]; a failing file is labelled with its path.
pub fn half_mass_trend_sweep<P: AsRef<Path>>(
    config: &AnalysisConfig,
    runner: &SweepRunner,
    points: impl IntoIterator<Item = (f64, Vec<P>)>,
) -> Result<TrendSweep> {
    let aggregator = EnsembleAggregator::from_config(&config.trend)?;
    let default_mass = config.gravity.default_mass;
    let points: Vec<ParameterPoint<PathBuf>> = points
        .into_iter()
        .map(|(parameter, paths)| ParameterPoint {
            parameter,
            runs: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
        })
        .collect();

    let outcome = runner.run(points, |point| {
        let runs = point
            .runs
            .iter()
            .map(|path| {
                load_particle_states(path, default_mass)
                    .and_then(|rows| half_mass_radius_series(&rows))
                    .and_then(|(times, radii)| TimeSeries::new(times, radii))
                    .map_err(|e| e.at_sweep_point(format!("run {}", path.display())))
            })
            .collect::<Result<Vec<_>>>()?;
        aggregator.aggregate(&runs)
    })?;

    Ok(TrendSweep::new(
        outcome
            .completed
            .into_iter()
            .map(|(point, summary)| (point.parameter, summary))
            .collect(),
        outcome.failures,
    ))
}
