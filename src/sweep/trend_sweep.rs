//! Trend sweep result - one ensemble summary per sweep parameter

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};

use super::SweepFailure;
use crate::ensemble::{common_envelope_max, EnsembleSummary};
use crate::storage::{create_output, float_column, write_csv};
use crate::Result;

/// Trend of one sweep point, ready for a trend-vs-parameter plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Sweep parameter (particle count, step size, ...)
    pub parameter: f64,
    /// Slope of the stationary mean curve
    pub slope: f64,
    /// Std of the per-run slopes
    pub slope_std: f64,
    /// Intercept of the stationary mean curve
    pub intercept: f64,
    /// Runs stacked at this point
    pub run_count: usize,
}

/// Ensemble summaries sorted by sweep parameter, plus skipped points.
#[derive(Debug, Default)]
pub struct TrendSweep {
    summaries: Vec<(f64, EnsembleSummary)>,
    failures: Vec<SweepFailure>,
}

impl TrendSweep {
    pub(crate) fn new(mut summaries: Vec<(f64, EnsembleSummary)>, failures: Vec<SweepFailure>) -> Self {
        summaries.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            summaries,
            failures,
        }
    }

    /// `(parameter, summary)` pairs, ascending by parameter
    #[must_use]
    pub fn summaries(&self) -> &[(f64, EnsembleSummary)] {
        &self.summaries
    }

    /// Sweep points that failed and were skipped
    #[must_use]
    pub fn failures(&self) -> &[SweepFailure] {
        &self.failures
    }

    /// Number of completed points
    #[must_use]
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// True if no point completed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// One trend point per completed sweep point, ascending by parameter.
    #[must_use]
    pub fn points(&self) -> Vec<TrendPoint> {
        self.summaries
            .iter()
            .map(|(parameter, summary)| TrendPoint {
                parameter: *parameter,
                slope: summary.slope(),
                slope_std: summary.slope_std,
                intercept: summary.fit.intercept,
                run_count: summary.run_count,
            })
            .collect()
    }

    /// Shared upper y-limit for plotting every point's mean ± std curve.
    #[must_use]
    pub fn envelope_max(&self) -> Option<f64> {
        common_envelope_max(self.summaries.iter().map(|(_, summary)| summary))
    }

    /// Points as a `parameter,slope,slope_std,intercept,runs` batch.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Arrow`] if the batch cannot be assembled.
    pub fn batch(&self) -> Result<RecordBatch> {
        let points = self.points();
        let schema = Schema::new(vec![
            Field::new("parameter", DataType::Float64, false),
            Field::new("slope", DataType::Float64, false),
            Field::new("slope_std", DataType::Float64, false),
            Field::new("intercept", DataType::Float64, false),
            Field::new("runs", DataType::UInt64, false),
        ]);
        let runs: UInt64Array = points.iter().map(|p| p.run_count as u64).collect();
        let columns: Vec<ArrayRef> = vec![
            float_column(points.iter().map(|p| p.parameter)),
            float_column(points.iter().map(|p| p.slope)),
            float_column(points.iter().map(|p| p.slope_std)),
            float_column(points.iter().map(|p| p.intercept)),
            Arc::new(runs),
        ];
        Ok(RecordBatch::try_new(Arc::new(schema), columns)?)
    }

    /// Write the trend points as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Arrow`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_csv(writer, &self.batch()?)
    }

    /// Write the trend points to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::StorageError`] or [`crate::Error::Arrow`].
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(create_output(path)?)
    }
}
