/// Shared data types for the FloodSense risk estimator.
///
/// Infrastructure records come in from the CSV loader, rainfall samples come
/// in from the archive API or the simulator, and risk assessments go out to
/// the table, the CSV report, and the HTTP endpoint. Error enums for each
/// concern live here too so every module reports failures the same way.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

/// Kind of water infrastructure asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfrastructureType {
    #[serde(rename = "Private Well")]
    PrivateWell,
    #[serde(rename = "Treatment Plant")]
    TreatmentPlant,
    #[serde(rename = "Sewage Station")]
    SewageStation,
}

impl InfrastructureType {
    pub const ALL: [InfrastructureType; 3] = [
        InfrastructureType::PrivateWell,
        InfrastructureType::TreatmentPlant,
        InfrastructureType::SewageStation,
    ];

    /// Spelling used in the infrastructure CSV and the risk report.
    pub fn label(&self) -> &'static str {
        match self {
            InfrastructureType::PrivateWell => "Private Well",
            InfrastructureType::TreatmentPlant => "Treatment Plant",
            InfrastructureType::SewageStation => "Sewage Station",
        }
    }
}

impl fmt::Display for InfrastructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InfrastructureType {
    type Err = String;

    /// Accepts the CSV spelling ("Private Well") case-insensitively, plus the
    /// compact forms ("private_well", "PrivateWell") used in query strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "privatewell" => Ok(InfrastructureType::PrivateWell),
            "treatmentplant" => Ok(InfrastructureType::TreatmentPlant),
            "sewagestation" => Ok(InfrastructureType::SewageStation),
            _ => Err(format!("unknown infrastructure type '{}'", s)),
        }
    }
}

/// A single asset from the infrastructure data file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: InfrastructureType,
    /// Years in service.
    pub age: f64,
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

/// Flood risk classification, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Moderate => "Moderate",
            RiskLevel::High => "High",
        }
    }

    /// Action recommended to the water utility at this risk level.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Monitor only",
            RiskLevel::Moderate => "Prepare boil water notice",
            RiskLevel::High => "Issue boil water notice",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An infrastructure record annotated with the outcome of one estimation pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    #[serde(flatten)]
    pub record: InfrastructureRecord,
    /// Rainfall (mm) the assessment was computed for.
    pub rainfall: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}

// ---------------------------------------------------------------------------
// Rainfall
// ---------------------------------------------------------------------------

/// Where a rainfall series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallSource {
    Live,
    Simulated,
}

/// One precipitation measurement, stamped in the civil timezone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallSample {
    pub timestamp: DateTime<Tz>,
    pub precipitation_mm: f64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure to obtain a usable rainfall series.
///
/// Every variant means "no data"; callers fall back to simulation rather than
/// treating an empty series as valid.
#[derive(Debug, thiserror::Error)]
pub enum RainfallError {
    /// Connection refused, DNS failure, timeout, or client construction error.
    #[error("network error: {0}")]
    Network(String),

    /// Archive responded with a non-success status.
    #[error("archive API returned HTTP {0}")]
    HttpStatus(u16),

    /// Body was not the expected JSON shape, or a timestamp was unreadable.
    #[error("failed to parse archive response: {0}")]
    Parse(String),

    /// Structurally valid response with no usable samples.
    #[error("no rainfall data available: {0}")]
    NoData(String),

    /// Simulation or window parameters out of range.
    #[error("invalid rainfall parameters: {0}")]
    InvalidParameters(String),
}

/// Failure to read infrastructure records.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("line {line}: missing required field '{field}'")]
    MissingField { line: u64, field: &'static str },

    #[error("line {line}: invalid value for '{field}': {message}")]
    InvalidValue {
        line: u64,
        field: &'static str,
        message: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected input to the risk estimator.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RiskError {
    #[error("rainfall must be a finite, non-negative number of millimetres (got {0})")]
    InvalidRainfall(f64),
}

/// Failure to write the CSV risk report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
