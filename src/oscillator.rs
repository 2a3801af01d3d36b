//! Damped harmonic oscillator: closed-form solution and trajectory comparison
//!
//! For `m x'' + gamma x' + k x = 0` with `x(0) = A`, `v(0) = -A beta`:
//!
//! ```text
//! omega0 = sqrt(k / m)
//! beta   = gamma / (2 m)
//! omegad = sqrt(omega0^2 - beta^2)
//! x(t)   =  A e^(-beta t) cos(omegad t)
//! v(t)   = -A e^(-beta t) (beta cos(omegad t) + omegad sin(omegad t))
//! ```
//!
//! Only the underdamped regime (`omega0^2 > beta^2`) has this form; anything
//! else is rejected with [`Error::Overdamped`] instead of evaluating to NaN.

use serde::{Deserialize, Serialize};

use crate::config::OscillatorParams;
use crate::metrics::mean_squared_error;
use crate::{Error, Result};

/// One sample of a simulated oscillator trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorSample {
    /// Sample time
    pub time: f64,
    /// Position along x
    pub position: f64,
    /// Velocity along x
    pub velocity: f64,
}

/// Time-ordered oscillator trajectory as read from the simulator output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OscillatorTrajectory {
    samples: Vec<OscillatorSample>,
}

impl OscillatorTrajectory {
    /// Wrap samples. Order is kept as given.
    #[must_use]
    pub const fn new(samples: Vec<OscillatorSample>) -> Self {
        Self { samples }
    }

    /// All samples
    #[must_use]
    pub fn samples(&self) -> &[OscillatorSample] {
        &self.samples
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if there are no samples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Sample times
    #[must_use]
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Sample positions
    #[must_use]
    pub fn positions(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.position).collect()
    }

    /// Sample velocities
    #[must_use]
    pub fn velocities(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.velocity).collect()
    }

    /// Samples with `t_min <= time <= t_max`, for zoomed comparisons.
    #[must_use]
    pub fn window(&self, t_min: f64, t_max: f64) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .filter(|s| s.time >= t_min && s.time <= t_max)
                .copied()
                .collect(),
        }
    }
}

/// Closed-form position and velocity at a set of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticTrajectory {
    /// Evaluation times, in input order
    pub times: Vec<f64>,
    /// `x(t)` per time
    pub positions: Vec<f64>,
    /// `v(t)` per time
    pub velocities: Vec<f64>,
}

/// Validated underdamped oscillator, ready for evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DampedOscillator {
    amplitude: f64,
    beta: f64,
    omega_d: f64,
}

impl DampedOscillator {
    /// Validate parameters and precompute the decay rate and damped frequency.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] if `m <= 0`, `k <= 0` or any value is not finite
    /// - [`Error::Overdamped`] if `omega0^2 <= beta^2`
    pub fn new(params: &OscillatorParams) -> Result<Self> {
        let OscillatorParams {
            mass,
            spring_constant,
            damping,
            amplitude,
        } = *params;

        if ![mass, spring_constant, damping, amplitude]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(Error::InvalidParameter(format!(
                "oscillator parameters must be finite: {params:?}"
            )));
        }
        if mass <= 0.0 {
            return Err(Error::InvalidParameter(format!("mass must be positive, got {mass}")));
        }
        if spring_constant <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "spring constant must be positive, got {spring_constant}"
            )));
        }

        let omega0_sq = spring_constant / mass;
        let beta = damping / (2.0 * mass);
        let beta_sq = beta * beta;
        if omega0_sq <= beta_sq {
            return Err(Error::Overdamped { omega0_sq, beta_sq });
        }

        Ok(Self {
            amplitude,
            beta,
            omega_d: (omega0_sq - beta_sq).sqrt(),
        })
    }

    /// Decay rate `beta = gamma / 2m`
    #[must_use]
    pub const fn beta(&self) -> f64 {
        self.beta
    }

    /// Damped angular frequency `omegad`
    #[must_use]
    pub const fn damped_frequency(&self) -> f64 {
        self.omega_d
    }

    /// `x(t)`
    #[must_use]
    pub fn position(&self, t: f64) -> f64 {
        self.amplitude * (-self.beta * t).exp() * (self.omega_d * t).cos()
    }

    /// `v(t)`
    #[must_use]
    pub fn velocity(&self, t: f64) -> f64 {
        let (sin, cos) = (self.omega_d * t).sin_cos();
        -self.amplitude * (-self.beta * t).exp() * self.beta.mul_add(cos, self.omega_d * sin)
    }

    /// Evaluate position and velocity pointwise. Input order is preserved.
    #[must_use]
    pub fn evaluate(&self, times: &[f64]) -> AnalyticTrajectory {
        AnalyticTrajectory {
            times: times.to_vec(),
            positions: times.iter().map(|&t| self.position(t)).collect(),
            velocities: times.iter().map(|&t| self.velocity(t)).collect(),
        }
    }
}

/// Closed-form damped oscillator solution at each of `times`.
///
/// # Errors
///
/// - [`Error::EmptyInput`] if `times` is empty
/// - any error of [`DampedOscillator::new`]
///
/// # Example
///
/// ```rust
/// use simtrace::config::OscillatorParams;
/// use simtrace::oscillator::analytic_solution;
///
/// let trajectory = analytic_solution(&[0.0, 0.1], &OscillatorParams::default())?;
/// assert!((trajectory.positions[0] - 1.0).abs() < 1e-15);
/// # Ok::<(), simtrace::Error>(())
/// ```
pub fn analytic_solution(times: &[f64], params: &OscillatorParams) -> Result<AnalyticTrajectory> {
    if times.is_empty() {
        return Err(Error::EmptyInput("no sample times to evaluate".to_string()));
    }
    Ok(DampedOscillator::new(params)?.evaluate(times))
}

/// Position and velocity mean-squared errors against the analytic solution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorErrors {
    /// Position MSE
    pub position_mse: f64,
    /// Velocity MSE
    pub velocity_mse: f64,
}

/// Which oscillator error a sweep should record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorMetric {
    /// Position MSE
    #[default]
    Position,
    /// Velocity MSE
    Velocity,
}

impl OscillatorErrors {
    /// Select one of the two errors.
    #[must_use]
    pub const fn get(&self, metric: OscillatorMetric) -> f64 {
        match metric {
            OscillatorMetric::Position => self.position_mse,
            OscillatorMetric::Velocity => self.velocity_mse,
        }
    }
}

/// Compare a simulated trajectory with the closed-form solution at the same times.
///
/// # Errors
///
/// Propagates [`analytic_solution`] errors (empty trajectory, invalid or
/// overdamped parameters).
pub fn compare_trajectory(
    trajectory: &OscillatorTrajectory,
    params: &OscillatorParams,
) -> Result<OscillatorErrors> {
    let analytic = analytic_solution(&trajectory.times(), params)?;
    Ok(OscillatorErrors {
        position_mse: mean_squared_error(&trajectory.positions(), &analytic.positions)?,
        velocity_mse: mean_squared_error(&trajectory.velocities(), &analytic.velocities)?,
    })
}
