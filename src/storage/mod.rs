//! Tabular storage (CSV through Arrow)
//!
//! Simulator output is comma-separated with one header row. Tables are read
//! into Arrow `RecordBatch`es against a schema built from that header, then
//! decoded into named-field records so no reducer ever addresses a column by
//! position.
//!
//! Header names are normalized before lookup: surrounding whitespace and a
//! leading `#` are dropped and the name is lowercased, so `Time`, `time` and
//! `# time` all name the same column.
//!
//! | table           | required columns                    | optional     |
//! |-----------------|-------------------------------------|--------------|
//! | particle states | `time, id, x, y, z, vx, vy, vz`     | `m` / `mass` |
//! | oscillator      | `time, x, vx`                       | `id`         |
//! | energy summary  | `time, e_kin, e_pot, e_tot`         |              |
//!
//! Any cell that fails to parse, or is empty, is a malformed row. Nothing is
//! skipped.

mod schema;

pub use schema::{normalize_column_name, schema_from_header};

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array};
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use tracing::debug;

use crate::energy::EnergyRecord;
use crate::oscillator::{OscillatorSample, OscillatorTrajectory};
use crate::timestep::ParticleState;
use crate::{Error, Result};

/// A CSV table held as Arrow record batches.
#[derive(Debug, Clone)]
pub struct CsvTable {
    source_name: String,
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl CsvTable {
    /// Load a CSV file.
    ///
    /// # Errors
    ///
    /// - [`Error::StorageError`] if the file cannot be opened
    /// - [`Error::EmptyInput`] if it has no header line
    /// - [`Error::MalformedRow`] if any row fails to parse
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::StorageError(format!("Failed to open {}: {e}", path.display()))
        })?;
        Self::from_reader(path.display().to_string(), file)
    }

    /// Parse CSV text held in memory.
    ///
    /// # Errors
    ///
    /// Same as [`CsvTable::load`].
    pub fn from_csv_str(source_name: impl Into<String>, text: &str) -> Result<Self> {
        Self::from_reader(source_name, Cursor::new(text.as_bytes()))
    }

    /// Parse CSV from any seekable reader. The header is read first, then the
    /// reader is rewound and parsed against the schema derived from it.
    ///
    /// # Errors
    ///
    /// Same as [`CsvTable::load`].
    pub fn from_reader<R: Read + Seek>(source_name: impl Into<String>, mut reader: R) -> Result<Self> {
        let source_name = source_name.into();

        let mut header = String::new();
        BufReader::new(&mut reader).read_line(&mut header)?;
        if header.trim().is_empty() {
            return Err(Error::EmptyInput(format!("{source_name} has no header line")));
        }
        reader.seek(SeekFrom::Start(0))?;

        let schema = Arc::new(schema_from_header(&header));
        let csv = ReaderBuilder::new(Arc::clone(&schema))
            .with_header(true)
            .build(reader)?;

        let mut batches = Vec::new();
        for batch in csv {
            let batch = batch.map_err(|e| Error::MalformedRow {
                source_name: source_name.clone(),
                reason: parse_failure_reason(&schema, &e),
            })?;
            batches.push(batch);
        }

        let table = Self {
            source_name,
            schema,
            batches,
        };
        debug!(
            source = %table.source_name,
            rows = table.num_rows(),
            columns = table.schema.fields().len(),
            "loaded csv table"
        );
        Ok(table)
    }

    /// File or stream the table came from
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Schema built from the normalized header
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// All record batches
    #[must_use]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    /// Total number of data rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// True if the table has the (normalized) column
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    fn column_index(&self, names: &[&str]) -> Result<usize> {
        self.find_column(names).ok_or_else(|| Error::MissingColumn {
            source_name: self.source_name.clone(),
            column: names.join("|"),
        })
    }

    fn find_column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.schema.index_of(name).ok())
    }

    /// Visit every row with its 1-based file line (header is line 1).
    fn for_each_row<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&RecordBatch, usize, usize) -> Result<()>,
    {
        let mut line = 2;
        for batch in &self.batches {
            for row in 0..batch.num_rows() {
                visit(batch, row, line)?;
                line += 1;
            }
        }
        Ok(())
    }

    fn float(&self, batch: &RecordBatch, column: usize, row: usize, line: usize) -> Result<f64> {
        let array = batch
            .column(column)
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| {
                Error::StorageError(format!(
                    "column '{}' in {} is not Float64",
                    self.schema.field(column).name(),
                    self.source_name
                ))
            })?;
        if array.is_null(row) {
            return Err(self.malformed(line, column, "empty cell"));
        }
        Ok(array.value(row))
    }

    fn particle_id(&self, batch: &RecordBatch, column: usize, row: usize, line: usize) -> Result<u32> {
        let array = batch
            .column(column)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                Error::StorageError(format!(
                    "column '{}' in {} is not Int64",
                    self.schema.field(column).name(),
                    self.source_name
                ))
            })?;
        if array.is_null(row) {
            return Err(self.malformed(line, column, "empty cell"));
        }
        let raw = array.value(row);
        u32::try_from(raw).map_err(|_| self.malformed(line, column, &format!("invalid particle id {raw}")))
    }

    /// Float cell that must hold a finite number.
    fn finite(&self, batch: &RecordBatch, column: usize, row: usize, line: usize) -> Result<f64> {
        let value = self.float(batch, column, row, line)?;
        if !value.is_finite() {
            return Err(self.malformed(line, column, &format!("non-finite value {value}")));
        }
        Ok(value)
    }

    fn malformed(&self, line: usize, column: usize, reason: &str) -> Error {
        Error::MalformedRow {
            source_name: self.source_name.clone(),
            reason: format!(
                "line {line}, column '{}': {reason}",
                self.schema.field(column).name()
            ),
        }
    }

    /// Decode a particle-state table.
    ///
    /// Rows without a mass column get `default_mass`.
    ///
    /// # Errors
    ///
    /// [`Error::MissingColumn`] or [`Error::MalformedRow`].
    pub fn particle_states(&self, default_mass: f64) -> Result<Vec<ParticleState>> {
        let time = self.column_index(&["time"])?;
        let id = self.column_index(&["id", "particle_id"])?;
        let position = [
            self.column_index(&["x"])?,
            self.column_index(&["y"])?,
            self.column_index(&["z"])?,
        ];
        let velocity = [
            self.column_index(&["vx"])?,
            self.column_index(&["vy"])?,
            self.column_index(&["vz"])?,
        ];
        let mass = self.find_column(&["m", "mass"]);

        let mut states = Vec::with_capacity(self.num_rows());
        self.for_each_row(|batch, row, line| {
            let read3 = |cols: [usize; 3]| -> Result<[f64; 3]> {
                Ok([
                    self.finite(batch, cols[0], row, line)?,
                    self.finite(batch, cols[1], row, line)?,
                    self.finite(batch, cols[2], row, line)?,
                ])
            };
            states.push(ParticleState {
                time: self.finite(batch, time, row, line)?,
                id: self.particle_id(batch, id, row, line)?,
                position: read3(position)?,
                velocity: read3(velocity)?,
                mass: match mass {
                    Some(col) => self.finite(batch, col, row, line)?,
                    None => default_mass,
                },
            });
            Ok(())
        })?;
        Ok(states)
    }

    /// Decode a single-particle oscillator trajectory (`time`, `x`, `vx`).
    ///
    /// # Errors
    ///
    /// [`Error::MissingColumn`], [`Error::MalformedRow`], or
    /// [`Error::StorageError`] if an `id` column names more than one particle.
    pub fn oscillator_trajectory(&self) -> Result<OscillatorTrajectory> {
        let time = self.column_index(&["time"])?;
        let x = self.column_index(&["x"])?;
        let vx = self.column_index(&["vx"])?;
        let id = self.find_column(&["id", "particle_id"]);

        let mut first_id: Option<u32> = None;
        let mut samples = Vec::with_capacity(self.num_rows());
        self.for_each_row(|batch, row, line| {
            if let Some(col) = id {
                let pid = self.particle_id(batch, col, row, line)?;
                match first_id {
                    None => first_id = Some(pid),
                    Some(first) if first != pid => {
                        return Err(Error::StorageError(format!(
                            "{} holds particles {first} and {pid}; an oscillator trajectory has exactly one",
                            self.source_name
                        )));
                    }
                    Some(_) => {}
                }
            }
            samples.push(OscillatorSample {
                time: self.finite(batch, time, row, line)?,
                position: self.finite(batch, x, row, line)?,
                velocity: self.finite(batch, vx, row, line)?,
            });
            Ok(())
        })?;
        Ok(OscillatorTrajectory::new(samples))
    }

    /// Decode an energy summary table. Non-finite energies are kept so that
    /// drift statistics can name the sample where a run diverged.
    ///
    /// # Errors
    ///
    /// [`Error::MissingColumn`] or [`Error::MalformedRow`].
    pub fn energy_records(&self) -> Result<Vec<EnergyRecord>> {
        let time = self.column_index(&["time"])?;
        let kinetic = self.column_index(&["e_kin"])?;
        let potential = self.column_index(&["e_pot"])?;
        let total = self.column_index(&["e_tot"])?;

        let mut records = Vec::with_capacity(self.num_rows());
        self.for_each_row(|batch, row, line| {
            records.push(EnergyRecord {
                time: self.finite(batch, time, row, line)?,
                kinetic: self.float(batch, kinetic, row, line)?,
                potential: self.float(batch, potential, row, line)?,
                total: self.float(batch, total, row, line)?,
            });
            Ok(())
        })?;
        Ok(records)
    }
}

/// Load a particle-state table from disk.
///
/// # Errors
///
/// See [`CsvTable::load`] and [`CsvTable::particle_states`].
pub fn load_particle_states<P: AsRef<Path>>(path: P, default_mass: f64) -> Result<Vec<ParticleState>> {
    CsvTable::load(path)?.particle_states(default_mass)
}

/// Load an oscillator trajectory from disk.
///
/// # Errors
///
/// See [`CsvTable::load`] and [`CsvTable::oscillator_trajectory`].
pub fn load_oscillator_trajectory<P: AsRef<Path>>(path: P) -> Result<OscillatorTrajectory> {
    CsvTable::load(path)?.oscillator_trajectory()
}

/// Load an energy summary table from disk.
///
/// # Errors
///
/// See [`CsvTable::load`] and [`CsvTable::energy_records`].
pub fn load_energy_records<P: AsRef<Path>>(path: P) -> Result<Vec<EnergyRecord>> {
    CsvTable::load(path)?.energy_records()
}

/// Write one record batch as CSV with a header row.
///
/// # Errors
///
/// Returns [`Error::Arrow`] if writing fails.
pub fn write_csv<W: Write>(writer: W, batch: &RecordBatch) -> Result<()> {
    let mut csv = WriterBuilder::new().with_header(true).build(writer);
    csv.write(batch)?;
    Ok(())
}

/// Create (or truncate) an output file.
///
/// # Errors
///
/// Returns [`Error::StorageError`] naming the path.
pub fn create_output<P: AsRef<Path>>(path: P) -> Result<File> {
    let path = path.as_ref();
    File::create(path).map_err(|e| Error::StorageError(format!("Failed to create {}: {e}", path.display())))
}

/// Describe an Arrow CSV failure the way row decoding does: file line
/// (header is line 1) and column name. Arrow counts lines from 0.
fn parse_failure_reason(schema: &Schema, error: &ArrowError) -> String {
    let ArrowError::ParseError(desc) = error else {
        return error.to_string();
    };
    let rewritten = || -> Option<String> {
        let (head, line) = desc.rsplit_once(" at line ")?;
        let line: usize = line.trim().parse().ok()?;
        let (head, column) = head.rsplit_once(" for column ")?;
        let column: usize = column.trim().parse().ok()?;
        let value = head.strip_prefix("Error while parsing value ")?;
        let name = schema.fields().get(column)?.name();
        Some(format!("line {}, column '{name}': cannot parse '{value}'", line + 1))
    };
    rewritten().unwrap_or_else(|| error.to_string())
}

/// Float64 column from values.
pub(crate) fn float_column(values: impl IntoIterator<Item = f64>) -> ArrayRef {
    Arc::new(Float64Array::from_iter_values(values))
}

/// Energy summary as a record batch with columns `Time,E_kin,E_pot,E_tot`.
///
/// # Errors
///
/// Returns [`Error::Arrow`] if the batch cannot be assembled.
pub fn energy_batch(records: &[EnergyRecord]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("Time", DataType::Float64, false),
        Field::new("E_kin", DataType::Float64, false),
        Field::new("E_pot", DataType::Float64, false),
        Field::new("E_tot", DataType::Float64, false),
    ]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![
            float_column(records.iter().map(|r| r.time)),
            float_column(records.iter().map(|r| r.kinetic)),
            float_column(records.iter().map(|r| r.potential)),
            float_column(records.iter().map(|r| r.total)),
        ],
    )?)
}

/// Write an energy summary table.
///
/// # Errors
///
/// Returns [`Error::Arrow`] if writing fails.
pub fn write_energy_csv<W: Write>(writer: W, records: &[EnergyRecord]) -> Result<()> {
    write_csv(writer, &energy_batch(records)?)
}

/// Write an energy summary table to a file.
///
/// # Errors
///
/// Returns [`Error::StorageError`] if the file cannot be created, or
/// [`Error::Arrow`] if writing fails.
pub fn save_energy_csv<P: AsRef<Path>>(path: P, records: &[EnergyRecord]) -> Result<()> {
    write_energy_csv(create_output(path)?, records)
}
