//! # simtrace: Post-processing for Oscillator and N-body Simulation Output
//!
//! **Version**: 0.1.0
//!
//! simtrace reads the tabular output of an external particle simulator and
//! reduces it to the numbers that go on accuracy and structure plots:
//!
//! - damped oscillator error against the closed-form solution
//! - kinetic and softened potential energy per timestep
//! - half-mass radius per timestep
//! - cross-run mean/std and stationary-range trend fits
//! - sweeps over integrator, step size and particle count
//!
//! Data flows one way: table on disk → load → per-timestep reduction →
//! cross-run aggregation → sweep aggregation. Every stage is a pure
//! single-pass transformation; the first unrecoverable error ends the
//! invocation.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use simtrace::oscillator::OscillatorMetric;
//! use simtrace::sweep::SweepKey;
//! use simtrace::Pipeline;
//!
//! let pipeline = Pipeline::builder().transient_cutoff(0.25).build()?;
//!
//! // Position MSE of each integrator/step trajectory against x(t)
//! let table = pipeline.oscillator_error_sweep(
//!     OscillatorMetric::Position,
//!     vec![
//!         (SweepKey::new("verlet", 1e-3), "out/verlet_1e-3.csv"),
//!         (SweepKey::new("gear5", 1e-3), "out/gear5_1e-3.csv"),
//!     ],
//! )?;
//! for (dt, mse) in table.points("verlet") {
//!     println!("{dt:e}\t{mse:e}");
//! }
//! # Ok::<(), simtrace::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod energy;
pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod oscillator;
pub mod storage;
pub mod structure;
pub mod sweep;
pub mod timestep;
pub mod trend;

pub use error::{Error, Result};

use std::path::Path;

use tracing::info;

use crate::config::{AnalysisConfig, GravityParams, OscillatorParams};
use crate::energy::EnergyRecord;
use crate::ensemble::{EnsembleAggregator, EnsembleSummary, TimeSeries};
use crate::metrics::EnergyDrift;
use crate::oscillator::{compare_trajectory, DampedOscillator, OscillatorErrors, OscillatorMetric};
use crate::storage::{load_energy_records, load_oscillator_trajectory, load_particle_states};
use crate::sweep::{DriftStatistic, FailurePolicy, SweepKey, SweepRunner, SweepTable, TrendSweep};
use crate::timestep::{half_mass_radius_series, TimestepAnalyzer, TimestepRecord};
use crate::trend::TrendVariant;

/// Analysis pipeline bound to one validated configuration.
#[derive(Debug)]
pub struct Pipeline {
    config: AnalysisConfig,
    analyzer: TimestepAnalyzer,
    aggregator: EnsembleAggregator,
    runner: SweepRunner,
}

impl Pipeline {
    /// Create a new pipeline builder
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Create a pipeline from a complete configuration.
    ///
    /// # Errors
    ///
    /// Same as [`PipelineBuilder::build`].
    pub fn from_config(config: AnalysisConfig) -> Result<Self> {
        PipelineBuilder { config }.build()
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Sweep runner carrying the configured failure policy
    #[must_use]
    pub const fn runner(&self) -> &SweepRunner {
        &self.runner
    }

    /// Position and velocity MSE of one oscillator trajectory file.
    ///
    /// # Errors
    ///
    /// Load errors, [`Error::Overdamped`], or [`Error::EmptyInput`].
    pub fn oscillator_errors<P: AsRef<Path>>(&self, path: P) -> Result<OscillatorErrors> {
        let trajectory = load_oscillator_trajectory(path)?;
        compare_trajectory(&trajectory, &self.config.oscillator)
    }

    /// Oscillator MSE restricted to `t_min <= t <= t_max`.
    ///
    /// # Errors
    ///
    /// As [`Pipeline::oscillator_errors`]; an empty window is
    /// [`Error::EmptyInput`].
    pub fn oscillator_errors_in_window<P: AsRef<Path>>(
        &self,
        path: P,
        t_min: f64,
        t_max: f64,
    ) -> Result<OscillatorErrors> {
        let trajectory = load_oscillator_trajectory(path)?.window(t_min, t_max);
        compare_trajectory(&trajectory, &self.config.oscillator)
    }

    /// Per-timestep energy, half-mass radius and particle count of one
    /// particle-state file.
    ///
    /// # Errors
    ///
    /// Load errors and [`TimestepAnalyzer::analyze`] errors.
    pub fn analyze_particles<P: AsRef<Path>>(&self, path: P) -> Result<Vec<TimestepRecord>> {
        let rows = load_particle_states(path, self.config.gravity.default_mass)?;
        self.analyzer.analyze(&rows)
    }

    /// Energy summary of one particle-state file, one record per timestep.
    ///
    /// # Errors
    ///
    /// Same as [`Pipeline::analyze_particles`].
    pub fn energy_summary<P: AsRef<Path>>(&self, path: P) -> Result<Vec<EnergyRecord>> {
        Ok(self
            .analyze_particles(path)?
            .into_iter()
            .map(|record| record.energy)
            .collect())
    }

    /// Relative drift of `E_tot` in an energy summary file.
    ///
    /// # Errors
    ///
    /// Load errors and [`EnergyDrift::from_totals`] errors.
    pub fn energy_drift<P: AsRef<Path>>(&self, path: P) -> Result<EnergyDrift> {
        let totals: Vec<f64> = load_energy_records(path)?.iter().map(|r| r.total).collect();
        EnergyDrift::from_totals(&totals)
    }

    /// Half-mass radius time series of one particle-state file.
    ///
    /// # Errors
    ///
    /// Load errors or [`Error::EmptyInput`].
    pub fn half_mass_series<P: AsRef<Path>>(&self, path: P) -> Result<TimeSeries> {
        let rows = load_particle_states(path, self.config.gravity.default_mass)?;
        let (times, radii) = half_mass_radius_series(&rows)?;
        TimeSeries::new(times, radii)
    }

    /// Stack runs sharing a time grid and fit the stationary trend.
    ///
    /// # Errors
    ///
    /// Same as [`EnsembleAggregator::aggregate`].
    pub fn aggregate(&self, runs: &[TimeSeries]) -> Result<EnsembleSummary> {
        self.aggregator.aggregate(runs)
    }

    /// Oscillator MSE sweep over `(integrator, step size)` trajectory files.
    ///
    /// # Errors
    ///
    /// See [`sweep::oscillator_error_sweep`].
    pub fn oscillator_error_sweep<P: AsRef<Path>>(
        &self,
        metric: OscillatorMetric,
        points: impl IntoIterator<Item = (SweepKey, P)>,
    ) -> Result<SweepTable> {
        let table = sweep::oscillator_error_sweep(&self.config.oscillator, metric, &self.runner, points)?;
        info!(
            records = table.len(),
            failures = table.failures().len(),
            "oscillator error sweep complete"
        );
        Ok(table)
    }

    /// Energy drift sweep over `(integrator, step size)` energy files.
    ///
    /// # Errors
    ///
    /// See [`sweep::energy_error_sweep`].
    pub fn energy_error_sweep<P: AsRef<Path>>(
        &self,
        statistic: DriftStatistic,
        points: impl IntoIterator<Item = (SweepKey, P)>,
    ) -> Result<SweepTable> {
        let table = sweep::energy_error_sweep(statistic, &self.runner, points)?;
        info!(
            records = table.len(),
            failures = table.failures().len(),
            "energy error sweep complete"
        );
        Ok(table)
    }

    /// Trend sweep over in-memory runs, one group per parameter.
    ///
    /// # Errors
    ///
    /// See [`sweep::trend_sweep`].
    pub fn trend_sweep(&self, points: impl IntoIterator<Item = (f64, Vec<TimeSeries>)>) -> Result<TrendSweep> {
        sweep::trend_sweep(&self.config.trend, &self.runner, points)
    }

    /// Half-mass radius trend sweep over particle-state files.
    ///
    /// # Errors
    ///
    /// See [`sweep::half_mass_trend_sweep`].
    pub fn half_mass_trend_sweep<P: AsRef<Path>>(
        &self,
        points: impl IntoIterator<Item = (f64, Vec<P>)>,
    ) -> Result<TrendSweep> {
        let trend = sweep::half_mass_trend_sweep(&self.config, &self.runner, points)?;
        info!(
            points = trend.len(),
            failures = trend.failures().len(),
            strategy = self.aggregator.strategy_name(),
            "half-mass trend sweep complete"
        );
        Ok(trend)
    }
}

/// Pipeline builder
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    config: AnalysisConfig,
}

impl PipelineBuilder {
    /// Replace the whole configuration
    #[must_use]
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Set oscillator constants
    #[must_use]
    pub const fn oscillator(mut self, params: OscillatorParams) -> Self {
        self.config.oscillator = params;
        self
    }

    /// Set gravitational constants
    #[must_use]
    pub const fn gravity(mut self, params: GravityParams) -> Self {
        self.config.gravity = params;
        self
    }

    /// Set the start of the stationary range
    #[must_use]
    pub const fn transient_cutoff(mut self, cutoff: f64) -> Self {
        self.config.trend.transient_cutoff = cutoff;
        self
    }

    /// Set the trend fitting strategy
    #[must_use]
    pub const fn trend_strategy(mut self, strategy: TrendVariant) -> Self {
        self.config.trend.strategy = strategy;
        self
    }

    /// Set the sweep failure policy
    #[must_use]
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.sweep.failure_policy = policy;
        self
    }

    /// Validate the configuration and build the pipeline.
    ///
    /// Oscillator constants are checked lazily on first use, so a pipeline
    /// used only for N-body tables accepts any oscillator section.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for negative or non-finite
    /// softening, a non-positive default mass, a non-finite `G`, or an
    /// invalid trend configuration.
    pub fn build(self) -> Result<Pipeline> {
        let gravity = &self.config.gravity;
        if !gravity.gravitational_constant.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "gravitational constant must be finite, got {}",
                gravity.gravitational_constant
            )));
        }
        if !(gravity.softening_length.is_finite() && gravity.softening_length >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "softening length must be finite and >= 0, got {}",
                gravity.softening_length
            )));
        }
        if !(gravity.default_mass.is_finite() && gravity.default_mass > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "default mass must be finite and > 0, got {}",
                gravity.default_mass
            )));
        }

        let aggregator = EnsembleAggregator::from_config(&self.config.trend)?;
        Ok(Pipeline {
            analyzer: TimestepAnalyzer::new(self.config.gravity),
            aggregator,
            runner: SweepRunner::from_config(&self.config.sweep),
            config: self.config,
        })
    }
}

/// Checks oscillator constants without loading any data.
///
/// # Errors
///
/// Same as [`DampedOscillator::new`].
pub fn validate_oscillator(params: &OscillatorParams) -> Result<()> {
    DampedOscillator::new(params).map(|_| ())
}
