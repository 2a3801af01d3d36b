//! Header normalization and schema construction

use arrow::datatypes::{DataType, Field, Schema};

/// Normalize a raw header cell: trim, drop a leading `#` and surrounding
/// quotes, lowercase.
#[must_use]
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('#')
        .trim()
        .trim_matches('"')
        .trim()
        .to_lowercase()
}

/// Integer-typed columns; everything else is read as Float64.
fn column_type(name: &str) -> DataType {
    match name {
        "id" | "particle_id" => DataType::Int64,
        _ => DataType::Float64,
    }
}

/// Arrow schema for a CSV header line. All fields are nullable so that empty
/// cells surface as nulls and can be reported with their line.
#[must_use]
pub fn schema_from_header(header: &str) -> Schema {
    let fields: Vec<Field> = header
        .split(',')
        .map(|raw| {
            let name = normalize_column_name(raw);
            let data_type = column_type(&name);
            Field::new(name, data_type, true)
        })
        .collect();
    Schema::new(fields)
}
