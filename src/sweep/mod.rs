//! Parameter sweeps
//!
//! A sweep evaluates one full analysis per point of a discrete parameter grid
//! (integrator × step size, or particle count). [`SweepRunner`] drives the
//! grid and applies the [`FailurePolicy`]; the drivers in this module turn
//! files on disk into a [`SweepTable`] or a [`TrendSweep`].
//!
//! A failed point is never stored as a placeholder metric. Under
//! [`FailurePolicy::Abort`] the first failure ends the sweep with an
//! [`Error::SweepPoint`](crate::Error::SweepPoint); under
//! [`FailurePolicy::SkipAndReport`] it is logged and kept in the result's
//! failure list.

mod drivers;
mod record;
mod table;
mod trend_sweep;

pub use drivers::{
    best_step_size, energy_error_sweep, half_mass_trend_sweep, oscillator_error_sweep, trend_sweep,
    DriftStatistic,
};
pub use record::{SweepKey, SweepRecord, SweepRecordBuilder};
pub use table::SweepTable;
pub use trend_sweep::{TrendPoint, TrendSweep};

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SweepConfig;
use crate::{Error, Result};

/// What to do when one sweep point fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the sweep and return the labelled error
    #[default]
    Abort,
    /// Log the failure, record it, and continue with the next point
    SkipAndReport,
}

/// A sweep point that failed under [`FailurePolicy::SkipAndReport`].
#[derive(Debug)]
pub struct SweepFailure {
    /// Sweep point label
    pub point: String,
    /// Why it failed
    pub error: Error,
}

/// Points that completed, with their results, and points that were skipped.
#[derive(Debug)]
pub struct SweepOutcome<P, T> {
    /// Completed points in traversal order
    pub completed: Vec<(P, T)>,
    /// Skipped points in traversal order
    pub failures: Vec<SweepFailure>,
}

/// Drives a sweep grid point by point.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepRunner {
    policy: FailurePolicy,
}

impl SweepRunner {
    /// Create a runner with the given failure policy.
    #[must_use]
    pub const fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// Create a runner from the `[sweep]` config section.
    #[must_use]
    pub const fn from_config(config: &SweepConfig) -> Self {
        Self::new(config.failure_policy)
    }

    /// Failure policy in use
    #[must_use]
    pub const fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Evaluate `eval` at every point, in order.
    ///
    /// # Errors
    ///
    /// Under [`FailurePolicy::Abort`], the first failing point's error wrapped
    /// in [`Error::SweepPoint`] with the point's `Display` label.
    pub fn run<P, T, I, F>(&self, points: I, mut eval: F) -> Result<SweepOutcome<P, T>>
    where
        I: IntoIterator<Item = P>,
        P: fmt::Display,
        F: FnMut(&P) -> Result<T>,
    {
        let mut outcome = SweepOutcome {
            completed: Vec::new(),
            failures: Vec::new(),
        };

        for point in points {
            match eval(&point) {
                Ok(value) => {
                    info!(point = %point, "sweep point completed");
                    outcome.completed.push((point, value));
                }
                Err(error) => match self.policy {
                    FailurePolicy::Abort => return Err(error.at_sweep_point(point.to_string())),
                    FailurePolicy::SkipAndReport => {
                        warn!(point = %point, error = %error, "skipping failed sweep point");
                        outcome.failures.push(SweepFailure {
                            point: point.to_string(),
                            error,
                        });
                    }
                },
            }
        }

        info!(
            completed = outcome.completed.len(),
            failed = outcome.failures.len(),
            "sweep finished"
        );
        Ok(outcome)
    }
}
