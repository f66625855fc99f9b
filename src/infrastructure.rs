/// Infrastructure data loader - parses the asset inventory CSV.
///
/// Expected columns: `name, type, age, latitude, longitude`. Column order
/// does not matter; extra columns are ignored. A missing file is not an
/// error: the dashboard presents a "no data" state instead.

use crate::model::{DataError, InfrastructureRecord, InfrastructureType};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Default location of the asset inventory, relative to the project root.
pub const DEFAULT_INFRASTRUCTURE_PATH: &str = "data/infrastructure.csv";

/// One CSV row before validation. Every field is optional so a missing
/// value can be reported by name instead of as a generic serde failure.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    age: Option<f64>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads infrastructure records from a CSV file.
///
/// Returns an empty collection (and logs a warning) if the file does not
/// exist.
///
/// # Errors
/// - `DataError::MissingField` - a row lacks `name`, `type`, `age`,
///   `latitude`, or `longitude`.
/// - `DataError::InvalidValue` - unknown `type` spelling.
/// - `DataError::Csv` / `DataError::Io` - unreadable file or malformed CSV.
pub fn load_infrastructure<P: AsRef<Path>>(path: P) -> Result<Vec<InfrastructureRecord>, DataError> {
    let path = path.as_ref();

    if !path.exists() {
        log::warn!("Infrastructure file {} not found; continuing with no assets", path.display());
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path)?;
    let records = parse_infrastructure(file)?;
    log::info!("Loaded {} infrastructure records from {}", records.len(), path.display());
    Ok(records)
}

/// Parses infrastructure records from any CSV source with a header row.
pub fn parse_infrastructure<R: Read>(reader: R) -> Result<Vec<InfrastructureRecord>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let raw: RawRecord = row.deserialize(Some(&headers))?;
        records.push(validate(raw, line)?);
    }

    Ok(records)
}

fn validate(raw: RawRecord, line: u64) -> Result<InfrastructureRecord, DataError> {
    let name = raw
        .name
        .filter(|n| !n.is_empty())
        .ok_or(DataError::MissingField { line, field: "name" })?;

    let kind_text = raw
        .kind
        .filter(|k| !k.is_empty())
        .ok_or(DataError::MissingField { line, field: "type" })?;

    let kind: InfrastructureType = kind_text.parse().map_err(|message| DataError::InvalidValue {
        line,
        field: "type",
        message,
    })?;

    let age = raw.age.ok_or(DataError::MissingField { line, field: "age" })?;
    let latitude = raw.latitude.ok_or(DataError::MissingField { line, field: "latitude" })?;
    let longitude = raw.longitude.ok_or(DataError::MissingField { line, field: "longitude" })?;

    for (field, value) in [("age", age), ("latitude", latitude), ("longitude", longitude)] {
        if !value.is_finite() {
            return Err(DataError::InvalidValue {
                line,
                field,
                message: format!("'{}' is not a finite number", value),
            });
        }
    }

    if age < 0.0 {
        // Kept as-is: the risk model scores negative ages below a new asset.
        log::warn!("line {}: '{}' has negative age {}", line, name, age);
    }

    Ok(InfrastructureRecord {
        name,
        kind,
        age,
        latitude,
        longitude,
    })
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Keeps only records whose type is in `types`. An empty selection keeps
/// everything, matching the dashboard's "no filter chosen" behavior.
pub fn filter_by_types(
    records: &[InfrastructureRecord],
    types: &[InfrastructureType],
) -> Vec<InfrastructureRecord> {
    if types.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|r| types.contains(&r.kind))
        .cloned()
        .collect()
}

/// Parses a comma-separated type list such as `"Private Well,Sewage Station"`.
/// Blank entries are ignored.
pub fn parse_type_list(list: &str) -> Result<Vec<InfrastructureType>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<InfrastructureType>())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
