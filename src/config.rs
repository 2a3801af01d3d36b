//! Analysis configuration
//!
//! Physical constants must match the parameters the external simulator ran
//! with; nothing here can check that. A mismatch silently yields wrong error
//! values, so the defaults mirror the simulator's defaults.
//!
//! ```rust
//! use simtrace::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_toml_str(
//!     r#"
//!     [gravity]
//!     softening_length = 0.0
//!
//!     [trend]
//!     transient_cutoff = 0.25
//!     strategy = { kind = "tail_fraction", frac_tail = 0.5 }
//!     "#,
//! )?;
//! assert_eq!(config.gravity.softening_length, 0.0);
//! assert!((config.oscillator.mass - 70.0).abs() < f64::EPSILON);
//! # Ok::<(), simtrace::Error>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sweep::FailurePolicy;
use crate::trend::TrendVariant;
use crate::{Error, Result};

/// Complete, immutable configuration for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Damped oscillator constants
    pub oscillator: OscillatorParams,
    /// Gravitational N-body constants
    pub gravity: GravityParams,
    /// Stationary-range trend fitting
    pub trend: TrendConfig,
    /// Sweep behavior
    pub sweep: SweepConfig,
}

/// Damped harmonic oscillator constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorParams {
    /// Mass `m`
    pub mass: f64,
    /// Spring constant `k`
    pub spring_constant: f64,
    /// Damping coefficient `gamma`
    pub damping: f64,
    /// Initial amplitude `A`
    pub amplitude: f64,
}

impl Default for OscillatorParams {
    fn default() -> Self {
        Self {
            mass: 70.0,
            spring_constant: 1.0e4,
            damping: 100.0,
            amplitude: 1.0,
        }
    }
}

/// Gravitational N-body constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityParams {
    /// Gravitational constant `G`
    pub gravitational_constant: f64,
    /// Plummer softening length `h` (zero means unsoftened)
    pub softening_length: f64,
    /// Mass assigned to every particle when the table has no mass column
    pub default_mass: f64,
    /// Require every snapshot's ids to be exactly `0..N-1` for a fixed N
    pub strict_particle_ids: bool,
}

impl Default for GravityParams {
    fn default() -> Self {
        Self {
            gravitational_constant: 1.0,
            softening_length: 0.05,
            default_mass: 1.0,
            strict_particle_ids: true,
        }
    }
}

/// Trend fitting over the stationary part of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Samples with `time >= transient_cutoff` form the stationary range
    pub transient_cutoff: f64,
    /// Which part of the stationary range the line is fitted to
    pub strategy: TrendVariant,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            transient_cutoff: 0.5,
            strategy: TrendVariant::FullRange,
        }
    }
}

/// Sweep behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// What to do when one sweep point fails
    pub failure_policy: FailurePolicy,
}

impl AnalysisConfig {
    /// Parse a configuration from TOML text. Missing sections take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML for this schema.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read and [`Error::Config`]
    /// if it cannot be parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration file, falling back to defaults if the file
    /// doesn't exist or doesn't parse.
    #[must_use]
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config file {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("Config file {} not found. Using defaults.", path.display());
                Self::default()
            }
        }
    }

    /// Serialize to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
