//! Sweep record - one (integrator, step size) → metric entry

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coordinates of one point in an integrator × step-size sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepKey {
    /// Integrator name as used by the simulator (e.g. "verlet")
    pub integrator: String,
    /// Integration step size
    pub step_size: f64,
}

impl SweepKey {
    /// Create a key.
    #[must_use]
    pub fn new(integrator: impl Into<String>, step_size: f64) -> Self {
        Self {
            integrator: integrator.into(),
            step_size,
        }
    }

    #[allow(clippy::float_cmp)]
    pub(crate) fn matches(&self, integrator: &str, step_size: f64) -> bool {
        self.integrator == integrator && self.step_size == step_size
    }
}

impl fmt::Display for SweepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dt={:e}", self.integrator, self.step_size)
    }
}

/// Scalar metric measured at one sweep point.
///
/// `uncertainty` is set when the metric is itself a mean (e.g. the standard
/// deviation of a relative energy error over time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    key: SweepKey,
    metric: f64,
    uncertainty: Option<f64>,
}

impl SweepRecord {
    /// Create a record without uncertainty.
    #[must_use]
    pub fn new(integrator: impl Into<String>, step_size: f64, metric: f64) -> Self {
        Self {
            key: SweepKey::new(integrator, step_size),
            metric,
            uncertainty: None,
        }
    }

    /// Create a builder for a record with optional fields.
    #[must_use]
    pub const fn builder(key: SweepKey, metric: f64) -> SweepRecordBuilder {
        SweepRecordBuilder::new(key, metric)
    }

    /// Sweep coordinates
    #[must_use]
    pub const fn key(&self) -> &SweepKey {
        &self.key
    }

    /// Integrator name
    #[must_use]
    pub fn integrator(&self) -> &str {
        &self.key.integrator
    }

    /// Step size
    #[must_use]
    pub const fn step_size(&self) -> f64 {
        self.key.step_size
    }

    /// Metric value
    #[must_use]
    pub const fn metric(&self) -> f64 {
        self.metric
    }

    /// Metric uncertainty, if known
    #[must_use]
    pub const fn uncertainty(&self) -> Option<f64> {
        self.uncertainty
    }
}

/// Builder for `SweepRecord`.
#[derive(Debug)]
pub struct SweepRecordBuilder {
    key: SweepKey,
    metric: f64,
    uncertainty: Option<f64>,
}

impl SweepRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub const fn new(key: SweepKey, metric: f64) -> Self {
        Self {
            key,
            metric,
            uncertainty: None,
        }
    }

    /// Set the metric uncertainty.
    #[must_use]
    pub const fn uncertainty(mut self, uncertainty: f64) -> Self {
        self.uncertainty = Some(uncertainty);
        self
    }

    /// Build the `SweepRecord`.
    #[must_use]
    pub fn build(self) -> SweepRecord {
        SweepRecord {
            key: self.key,
            metric: self.metric,
            uncertainty: self.uncertainty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_record_new() {
        let record = SweepRecord::new("verlet", 1e-3, 2.5e-7);
        assert_eq!(record.integrator(), "verlet");
        assert!((record.step_size() - 1e-3).abs() < f64::EPSILON);
        assert!((record.metric() - 2.5e-7).abs() < f64::EPSILON);
        assert!(record.uncertainty().is_none());
    }

    #[test]
    fn test_sweep_record_builder() {
        let record = SweepRecord::builder(SweepKey::new("gear5", 1e-4), 0.1)
            .uncertainty(0.02)
            .build();
        assert_eq!(record.uncertainty(), Some(0.02));
        assert!(record.key().matches("gear5", 1e-4));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(SweepKey::new("beeman", 0.001).to_string(), "beeman dt=1e-3");
    }
}
