//! Error types for simtrace
//!
//! Every failure is fatal to the pipeline invocation that hit it. Errors carry
//! enough context (source file, line, sweep point) to say what failed and why.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// simtrace error types
#[derive(Error, Debug)]
pub enum Error {
    /// Oscillator parameters outside the underdamped regime
    #[error(
        "Oscillator is not underdamped (omega0^2 = {omega0_sq}, beta^2 = {beta_sq})\n\
         Overdamped and critically-damped regimes are not supported"
    )]
    Overdamped {
        /// Squared natural frequency `k / m`
        omega0_sq: f64,
        /// Squared damping rate `(gamma / 2m)^2`
        beta_sq: f64,
    },

    /// Physical or analysis parameter is invalid
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two sequences that must be aligned have different lengths
    #[error("Length mismatch in {context}: {left} != {right}")]
    LengthMismatch {
        /// What was being compared
        context: String,
        /// Length of the left-hand sequence
        left: usize,
        /// Length of the right-hand sequence
        right: usize,
    },

    /// Runs expected to share a time grid do not
    #[error("Time grid mismatch in run {run}: {reason}")]
    TimeGridMismatch {
        /// Index of the offending run (0-based)
        run: usize,
        /// Where the grids diverge
        reason: String,
    },

    /// Snapshot particle ids are not `0..N-1` for a fixed N
    #[error("Particle id mismatch at t = {time}: {reason}")]
    ParticleIdMismatch {
        /// Snapshot time
        time: f64,
        /// What is wrong with the id set
        reason: String,
    },

    /// Nothing to reduce
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Required column absent from a table header
    #[error("Missing column '{column}' in {source_name}")]
    MissingColumn {
        /// File or stream the table came from
        source_name: String,
        /// Normalized column name
        column: String,
    },

    /// A row failed to parse as the expected column types
    #[error("Malformed row in {source_name}: {reason}")]
    MalformedRow {
        /// File or stream the table came from
        source_name: String,
        /// Parse failure detail, including the line when known
        reason: String,
    },

    /// A sweep point failed; wraps the underlying cause
    #[error("Sweep point {point} failed: {source}")]
    SweepPoint {
        /// Human-readable sweep point label
        point: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Configuration could not be parsed or serialized
    #[error("Config error: {0}")]
    Config(String),

    /// Storage error (CSV/Arrow)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Label this error with the sweep point that produced it.
    #[must_use]
    pub fn at_sweep_point(self, point: impl Into<String>) -> Self {
        Self::SweepPoint {
            point: point.into(),
            source: Box::new(self),
        }
    }

    /// Strip any sweep point labels and return the root cause.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::SweepPoint { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_point_wrapping() {
        let error = Error::EmptyInput("no runs".to_string()).at_sweep_point("N=100");
        let message = format!("{error}");
        assert!(message.contains("N=100"));
        assert!(message.contains("no runs"));
        assert!(matches!(error.root_cause(), Error::EmptyInput(_)));
    }

    #[test]
    fn test_nested_root_cause() {
        let error = Error::Config("bad".to_string())
            .at_sweep_point("inner")
            .at_sweep_point("outer");
        assert!(matches!(error.root_cause(), Error::Config(_)));
    }
}
