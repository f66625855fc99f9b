/// Dashboard session context.
///
/// Everything the dashboard remembers between user actions lives in a
/// `Session` owned by the caller (the CLI run, or the endpoint server):
/// rainfall mode, the cached simulated series, the selected date and
/// infrastructure types, and whether a run has been requested. The
/// estimation and rainfall modules stay stateless; this module only wires
/// them together.

use crate::infrastructure::filter_by_types;
use crate::model::{
    GeoPoint, InfrastructureRecord, InfrastructureType, RainfallError, RainfallSource, RiskAssessment, RiskError,
};
use crate::rainfall::{RainfallProvider, RainfallSeries, SimulationParams};
use crate::risk;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;

/// Where the dashboard takes its rainfall from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallMode {
    /// Archive fetch, falling back to simulation on failure.
    Live,
    /// Simulated series, generated once and cached until reset.
    Simulated,
}

/// The single rainfall value an assessment is run against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallReading {
    pub rainfall_mm: f64,
    pub source: ReadingSource,
    /// Timestamp of the sample used, when the value is a single sample.
    pub observed_at: Option<DateTime<Tz>>,
    /// Civil date of the daily total used, when the value is a daily total.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    Live,
    Simulated,
    Manual,
}

impl From<RainfallSource> for ReadingSource {
    fn from(source: RainfallSource) -> Self {
        match source {
            RainfallSource::Live => ReadingSource::Live,
            RainfallSource::Simulated => ReadingSource::Simulated,
        }
    }
}

/// Result of one "Run Simulation" action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssessmentOutcome {
    /// The user has not asked for a run yet.
    NotRequested,
    /// No infrastructure matched the current selection.
    NoData { rainfall: RainfallReading },
    Assessed {
        rainfall: RainfallReading,
        assessments: Vec<RiskAssessment>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Rainfall(#[from] RainfallError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error("{0} is not covered by the current rainfall series")]
    DateNotInSeries(NaiveDate),
}

/// Caller-owned dashboard state.
#[derive(Debug, Clone)]
pub struct Session {
    pub mode: RainfallMode,
    pub simulation: SimulationParams,
    pub selected_types: Vec<InfrastructureType>,
    pub selected_date: Option<NaiveDate>,
    /// Explicit rainfall override; bypasses both live and simulated data.
    pub manual_rainfall_mm: Option<f64>,
    run_requested: bool,
    simulated: Option<RainfallSeries>,
}

impl Session {
    pub fn new(simulation: SimulationParams) -> Self {
        Self {
            mode: RainfallMode::Live,
            simulation,
            selected_types: vec![InfrastructureType::PrivateWell],
            selected_date: None,
            manual_rainfall_mm: None,
            run_requested: false,
            simulated: None,
        }
    }

    pub fn run_requested(&self) -> bool {
        self.run_requested
    }

    pub fn request_run(&mut self) {
        self.run_requested = true;
    }

    /// Cached simulated series, if one has been generated.
    pub fn simulated_series(&self) -> Option<&RainfallSeries> {
        self.simulated.as_ref()
    }

    /// Switches rainfall mode. Leaving simulated mode keeps the cache so
    /// toggling back shows the same series.
    pub fn set_mode(&mut self, mode: RainfallMode) {
        self.mode = mode;
    }

    /// Replaces the simulation parameters and drops the cached series if
    /// they changed.
    pub fn set_simulation(&mut self, params: SimulationParams) {
        if params != self.simulation {
            self.simulation = params;
            self.simulated = None;
        }
    }

    /// "Reset": clears the run flag, the cached series, and the date.
    pub fn reset(&mut self) {
        self.run_requested = false;
        self.simulated = None;
        self.selected_date = None;
    }

    /// "Go to Home": reset plus back to live mode.
    pub fn go_home(&mut self) {
        self.reset();
        self.mode = RainfallMode::Live;
        self.manual_rainfall_mm = None;
    }

    /// Returns the series the current mode displays, generating and caching
    /// a simulated one when needed.
    pub fn rainfall_series(
        &mut self,
        provider: &RainfallProvider,
        point: GeoPoint,
        window_days: u32,
    ) -> Result<RainfallSeries, RainfallError> {
        match self.mode {
            RainfallMode::Live => provider.recent_or_simulated(point, window_days, self.simulation),
            RainfallMode::Simulated => {
                if let Some(series) = &self.simulated {
                    return Ok(series.clone());
                }
                let series = provider.simulate(self.simulation)?;
                self.simulated = Some(series.clone());
                Ok(series)
            }
        }
    }

    /// Picks the rainfall value to assess against.
    ///
    /// Manual override wins. Otherwise, with a selected date the daily total
    /// for that date is used; without one, the latest sample.
    pub fn current_rainfall(
        &mut self,
        provider: &RainfallProvider,
        point: GeoPoint,
        window_days: u32,
    ) -> Result<RainfallReading, SessionError> {
        if let Some(rainfall_mm) = self.manual_rainfall_mm {
            return Ok(RainfallReading {
                rainfall_mm,
                source: ReadingSource::Manual,
                observed_at: None,
                date: None,
            });
        }

        let series = self.rainfall_series(provider, point, window_days)?;
        reading_from_series(&series, self.selected_date)
    }
}

/// Rainfall value from a series: daily total on `date`, or the latest sample.
pub fn reading_from_series(series: &RainfallSeries, date: Option<NaiveDate>) -> Result<RainfallReading, SessionError> {
    match date {
        Some(date) => {
            let rainfall_mm = series.rainfall_on(date).ok_or(SessionError::DateNotInSeries(date))?;
            Ok(RainfallReading {
                rainfall_mm,
                source: series.source().into(),
                observed_at: None,
                date: Some(date),
            })
        }
        None => {
            let latest = series.latest();
            Ok(RainfallReading {
                rainfall_mm: latest.precipitation_mm,
                source: series.source().into(),
                observed_at: Some(latest.timestamp),
                date: None,
            })
        }
    }
}

/// Runs one assessment pass for the session's current selection.
pub fn run_assessment(
    session: &mut Session,
    provider: &RainfallProvider,
    point: GeoPoint,
    window_days: u32,
    records: &[InfrastructureRecord],
) -> Result<AssessmentOutcome, SessionError> {
    if !session.run_requested() {
        return Ok(AssessmentOutcome::NotRequested);
    }

    let rainfall = session.current_rainfall(provider, point, window_days)?;
    assess_selection(session, records, rainfall)
}

/// Filters `records` by the session's selected types and estimates risk.
pub fn assess_selection(
    session: &Session,
    records: &[InfrastructureRecord],
    rainfall: RainfallReading,
) -> Result<AssessmentOutcome, SessionError> {
    let selected = filter_by_types(records, &session.selected_types);
    if selected.is_empty() {
        return Ok(AssessmentOutcome::NoData { rainfall });
    }

    let assessments = risk::estimate(&selected, rainfall.rainfall_mm)?;
    Ok(AssessmentOutcome::Assessed { rainfall, assessments })
}
