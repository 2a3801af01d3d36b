//! Sweep table - in-memory store of sweep records and failures
//!
//! Insertion order follows the sweep grid traversal but carries no meaning:
//! every query that feeds a plot sorts by step size first.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::{SweepFailure, SweepRecord};
use crate::storage::{create_output, float_column, write_csv};
use crate::{Error, Result};

/// Store of (integrator, step size) → metric records.
#[derive(Debug, Default)]
pub struct SweepTable {
    records: Vec<SweepRecord>,
    failures: Vec<SweepFailure>,
}

impl SweepTable {
    /// Create a new empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the table holds no records (failures are not counted).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Add a record, replacing any record with the same key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the metric or its uncertainty
    /// is not finite. A NaN never enters the table.
    pub fn add_record(&mut self, record: SweepRecord) -> Result<()> {
        if !record.metric().is_finite() || record.uncertainty().is_some_and(|u| !u.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "non-finite metric at sweep point {}",
                record.key()
            )));
        }
        match self
            .records
            .iter_mut()
            .find(|r| r.key().matches(record.integrator(), record.step_size()))
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
        Ok(())
    }

    /// Record a failed sweep point.
    pub fn add_failure(&mut self, failure: SweepFailure) {
        self.failures.push(failure);
    }

    /// All records in insertion order
    #[must_use]
    pub fn records(&self) -> &[SweepRecord] {
        &self.records
    }

    /// Sweep points that failed and were skipped
    #[must_use]
    pub fn failures(&self) -> &[SweepFailure] {
        &self.failures
    }

    /// Get the record at one sweep point.
    #[must_use]
    pub fn get(&self, integrator: &str, step_size: f64) -> Option<&SweepRecord> {
        self.records
            .iter()
            .find(|r| r.key().matches(integrator, step_size))
    }

    /// Integrator names in first-appearance order.
    #[must_use]
    pub fn integrators(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for record in &self.records {
            if !names.contains(&record.integrator()) {
                names.push(record.integrator());
            }
        }
        names
    }

    /// Distinct step sizes, ascending.
    #[must_use]
    pub fn step_sizes(&self) -> Vec<f64> {
        let mut steps: Vec<f64> = self.records.iter().map(SweepRecord::step_size).collect();
        steps.sort_by(f64::total_cmp);
        #[allow(clippy::float_cmp)]
        steps.dedup_by(|a, b| a == b);
        steps
    }

    /// Records of one integrator, sorted by step size ascending.
    ///
    /// This is the primary query for error-vs-step plots.
    #[must_use]
    pub fn series(&self, integrator: &str) -> Vec<SweepRecord> {
        let mut series: Vec<SweepRecord> = self
            .records
            .iter()
            .filter(|r| r.integrator() == integrator)
            .cloned()
            .collect();
        series.sort_by(|a, b| a.step_size().total_cmp(&b.step_size()));
        series
    }

    /// `(step size, metric)` pairs of one integrator, ascending by step size.
    #[must_use]
    pub fn points(&self, integrator: &str) -> Vec<(f64, f64)> {
        self.series(integrator)
            .iter()
            .map(|r| (r.step_size(), r.metric()))
            .collect()
    }

    /// Wide table: a `dt` column, then one metric column per integrator.
    /// Missing points are null.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Arrow`] if the batch cannot be assembled.
    pub fn wide_batch(&self) -> Result<RecordBatch> {
        let steps = self.step_sizes();
        let integrators = self.integrators();

        let mut fields = vec![Field::new("dt", DataType::Float64, false)];
        let mut columns: Vec<ArrayRef> = vec![float_column(steps.iter().copied())];
        for name in &integrators {
            fields.push(Field::new(*name, DataType::Float64, true));
            let values: Float64Array = steps
                .iter()
                .map(|&dt| self.get(name, dt).map(SweepRecord::metric))
                .collect();
            columns.push(Arc::new(values));
        }
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }

    /// Write the wide table as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Arrow`] if writing fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_csv(writer, &self.wide_batch()?)
    }

    /// Write the wide table to a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] or [`Error::Arrow`].
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_csv(create_output(path)?)
    }

    /// Records and failures as pretty JSON, for downstream plotting tools.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StorageError`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let failures: Vec<serde_json::Value> = self
            .failures
            .iter()
            .map(|f| serde_json::json!({ "point": f.point, "reason": f.error.to_string() }))
            .collect();
        serde_json::to_string_pretty(&serde_json::json!({
            "records": self.records,
            "failures": failures,
        }))
        .map_err(|e| Error::StorageError(format!("Failed to serialize sweep table: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_default() {
        let table = SweepTable::new();
        assert!(table.is_empty());
        assert_eq!(table.len(), 0);
        assert!(table.failures().is_empty());
    }

    #[test]
    fn test_series_ordering() {
        let mut table = SweepTable::new();

        // Add out of order
        table.add_record(SweepRecord::new("verlet", 1e-2, 3.0)).unwrap();
        table.add_record(SweepRecord::new("verlet", 1e-4, 1.0)).unwrap();
        table.add_record(SweepRecord::new("beeman", 1e-3, 5.0)).unwrap();
        table.add_record(SweepRecord::new("verlet", 1e-3, 2.0)).unwrap();

        let series = table.series("verlet");
        assert_eq!(series.len(), 3);
        assert!((series[0].step_size() - 1e-4).abs() < f64::EPSILON);
        assert!((series[2].step_size() - 1e-2).abs() < f64::EPSILON);
        assert_eq!(table.points("verlet"), vec![(1e-4, 1.0), (1e-3, 2.0), (1e-2, 3.0)]);
        assert_eq!(table.integrators(), vec!["verlet", "beeman"]);
        assert_eq!(table.step_sizes(), vec![1e-4, 1e-3, 1e-2]);
    }

    #[test]
    fn test_duplicate_key_replaces() {
        let mut table = SweepTable::new();
        table.add_record(SweepRecord::new("verlet", 0.01, 1.0)).unwrap();
        table.add_record(SweepRecord::new("verlet", 0.01, 2.0)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("verlet", 0.01).unwrap().metric(), 2.0);
    }

    #[test]
    fn test_rejects_nan_metric() {
        let mut table = SweepTable::new();
        assert!(table.add_record(SweepRecord::new("verlet", 0.1, f64::NAN)).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_wide_csv() {
        let mut table = SweepTable::new();
        table.add_record(SweepRecord::new("verlet", 0.5, 1.0)).unwrap();
        table.add_record(SweepRecord::new("gear5", 0.5, 2.0)).unwrap();
        table.add_record(SweepRecord::new("verlet", 0.25, 3.0)).unwrap();

        let batch = table.wide_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 3);

        let mut buffer = Vec::new();
        table.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("dt,verlet,gear5"));
        assert_eq!(lines.next(), Some("0.25,3.0,"));
        assert_eq!(lines.next(), Some("0.5,1.0,2.0"));
    }

    #[test]
    fn test_json_export() {
        let mut table = SweepTable::new();
        table.add_record(SweepRecord::new("verlet", 0.5, 1.0)).unwrap();
        table.add_failure(SweepFailure {
            point: "gear5 dt=5e-1".to_string(),
            error: Error::EmptyInput("no samples".to_string()),
        });
        let json: serde_json::Value = serde_json::from_str(&table.to_json().unwrap()).unwrap();
        assert_eq!(json["records"].as_array().unwrap().len(), 1);
        assert_eq!(json["failures"][0]["point"], "gear5 dt=5e-1");
    }
}
