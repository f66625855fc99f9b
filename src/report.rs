/// CSV risk report export.
///
/// Columns: `name, type, age, rainfall, risk_level, recommendation`, with a
/// header row and one row per assessment. UTF-8, no BOM.

use crate::model::{ReportError, RiskAssessment};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// File name offered for downloads and used when no path is configured.
pub const DEFAULT_REPORT_FILE: &str = "floodsense_risk_report.csv";

#[derive(Serialize)]
struct ReportRow<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    age: f64,
    rainfall: f64,
    risk_level: &'static str,
    recommendation: &'a str,
}

impl<'a> From<&'a RiskAssessment> for ReportRow<'a> {
    fn from(assessment: &'a RiskAssessment) -> Self {
        ReportRow {
            name: &assessment.record.name,
            kind: assessment.record.kind.label(),
            age: assessment.record.age,
            rainfall: assessment.rainfall,
            risk_level: assessment.risk_level.label(),
            recommendation: &assessment.recommendation,
        }
    }
}

/// Writes the report to any writer. The header row is written even when
/// there are no assessments.
pub fn write_report<W: Write>(assessments: &[RiskAssessment], writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer.write_record(["name", "type", "age", "rainfall", "risk_level", "recommendation"])?;
    for assessment in assessments {
        csv_writer.serialize(ReportRow::from(assessment))?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Renders the report into memory, e.g. for an HTTP response body.
pub fn report_to_bytes(assessments: &[RiskAssessment]) -> Result<Vec<u8>, ReportError> {
    let mut buffer = Vec::new();
    write_report(assessments, &mut buffer)?;
    Ok(buffer)
}

/// Writes the report to `path`, replacing any existing file.
pub fn write_report_file<P: AsRef<Path>>(assessments: &[RiskAssessment], path: P) -> Result<(), ReportError> {
    let file = std::fs::File::create(path.as_ref())?;
    write_report(assessments, std::io::BufWriter::new(file))?;
    log::info!("Wrote {} assessments to {}", assessments.len(), path.as_ref().display());
    Ok(())
}
