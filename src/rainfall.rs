/// Rainfall acquisition: live archive fetch, simulation, and fallback.
///
/// A `RainfallSeries` is never empty. The live path either returns a real
/// series or a `RainfallError`; `recent_or_simulated` turns that error into
/// a simulated series so the dashboard always has something to assess.

use crate::config::AppConfig;
use crate::ingest::open_meteo;
use crate::model::{GeoPoint, RainfallError, RainfallSample, RainfallSource};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

// ============================================================================
// Series
// ============================================================================

/// Ordered, non-empty sequence of rainfall samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RainfallSeries {
    source: RainfallSource,
    samples: Vec<RainfallSample>,
}

impl RainfallSeries {
    /// Builds a series, sorting samples ascending by timestamp.
    ///
    /// # Errors
    /// `RainfallError::NoData` if `samples` is empty.
    pub fn new(source: RainfallSource, mut samples: Vec<RainfallSample>) -> Result<Self, RainfallError> {
        if samples.is_empty() {
            return Err(RainfallError::NoData("a rainfall series needs at least one sample".to_string()));
        }
        samples.sort_by_key(|s| s.timestamp);
        Ok(Self { source, samples })
    }

    pub fn source(&self) -> RainfallSource {
        self.source
    }

    pub fn samples(&self) -> &[RainfallSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recent sample.
    pub fn latest(&self) -> &RainfallSample {
        // Non-empty by construction.
        &self.samples[self.samples.len() - 1]
    }

    /// Sample with the highest precipitation (earliest wins on ties).
    pub fn peak(&self) -> &RainfallSample {
        self.samples
            .iter()
            .fold(&self.samples[0], |best, s| if s.precipitation_mm > best.precipitation_mm { s } else { best })
    }

    /// Total precipitation across the whole series.
    pub fn total_mm(&self) -> f64 {
        self.samples.iter().map(|s| s.precipitation_mm).sum()
    }

    /// Civil dates covered by the series, ascending, without duplicates.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.daily_totals().into_iter().map(|(date, _)| date).collect()
    }

    /// Precipitation summed per civil date, ascending.
    pub fn daily_totals(&self) -> Vec<(NaiveDate, f64)> {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for sample in &self.samples {
            *totals.entry(sample.timestamp.date_naive()).or_insert(0.0) += sample.precipitation_mm;
        }
        totals.into_iter().collect()
    }

    /// Total precipitation on one civil date, or `None` if the series does
    /// not cover it.
    pub fn rainfall_on(&self, date: NaiveDate) -> Option<f64> {
        let mut found = false;
        let mut total = 0.0;
        for sample in self.samples.iter().filter(|s| s.timestamp.date_naive() == date) {
            found = true;
            total += sample.precipitation_mm;
        }
        found.then_some(total)
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// Parameters for a simulated series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    pub days: u32,
    pub min_mm: f64,
    pub max_mm: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            days: 7,
            min_mm: 10.0,
            max_mm: 60.0,
        }
    }
}

/// Upper bound for simulated daily rainfall, in mm. Well above any recorded
/// daily total, and small enough for the sampler's range arithmetic.
pub const MAX_SIMULATED_MM: f64 = 10_000.0;

impl SimulationParams {
    /// `days >= 1` and `0 <= min_mm <= max_mm <= MAX_SIMULATED_MM`.
    pub fn validate(&self) -> Result<(), RainfallError> {
        if self.days == 0 {
            return Err(RainfallError::InvalidParameters("days must be at least 1".to_string()));
        }
        if !self.min_mm.is_finite() || !self.max_mm.is_finite() {
            return Err(RainfallError::InvalidParameters("rainfall bounds must be finite".to_string()));
        }
        if self.max_mm > MAX_SIMULATED_MM {
            return Err(RainfallError::InvalidParameters(format!(
                "max_mm must not exceed {} (got {})",
                MAX_SIMULATED_MM, self.max_mm
            )));
        }
        if self.min_mm < 0.0 {
            return Err(RainfallError::InvalidParameters(format!(
                "min_mm must be non-negative (got {})",
                self.min_mm
            )));
        }
        if self.min_mm > self.max_mm {
            return Err(RainfallError::InvalidParameters(format!(
                "min_mm {} exceeds max_mm {}",
                self.min_mm, self.max_mm
            )));
        }
        Ok(())
    }
}

/// Current civil date in `tz`.
pub fn civil_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Start of `date` in `tz`. Falls back to noon for zones whose DST
/// transition skips midnight.
fn start_of_day(tz: Tz, date: NaiveDate) -> Result<DateTime<Tz>, RainfallError> {
    [0, 12]
        .into_iter()
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .ok_or_else(|| RainfallError::InvalidParameters(format!("{} has no valid local time in {}", date, tz.name())))
}

/// Simulated daily series ending on `today`, drawn from `rng`.
///
/// Produces one sample per date in `[today - days + 1, today]`, stamped at
/// local midnight in `tz`, with precipitation uniform over
/// `[min_mm, max_mm]`.
pub fn simulate_on<R: Rng>(
    today: NaiveDate,
    tz: Tz,
    params: SimulationParams,
    rng: &mut R,
) -> Result<RainfallSeries, RainfallError> {
    params.validate()?;

    let mut samples = Vec::with_capacity(params.days as usize);
    for offset in (0..params.days).rev() {
        let date = today - Duration::days(i64::from(offset));
        let precipitation_mm = if params.min_mm == params.max_mm {
            params.min_mm
        } else {
            rng.gen_range(params.min_mm..=params.max_mm)
        };
        samples.push(RainfallSample {
            timestamp: start_of_day(tz, date)?,
            precipitation_mm,
        });
    }

    RainfallSeries::new(RainfallSource::Simulated, samples)
}

/// Simulated daily series ending today (civil date in `tz`).
pub fn simulate(tz: Tz, params: SimulationParams) -> Result<RainfallSeries, RainfallError> {
    simulate_on(civil_today(tz), tz, params, &mut rand::thread_rng())
}

// ============================================================================
// Provider
// ============================================================================

/// Live and simulated rainfall for one configured site.
pub struct RainfallProvider {
    client: reqwest::blocking::Client,
    archive_url: String,
    reporting_tz: Tz,
    civil_tz: Tz,
}

impl RainfallProvider {
    /// Builds a provider with a bounded request timeout.
    pub fn new(
        archive_url: impl Into<String>,
        reporting_tz: Tz,
        civil_tz: Tz,
        timeout: std::time::Duration,
    ) -> Result<Self, RainfallError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("floodsense/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RainfallError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            archive_url: archive_url.into(),
            reporting_tz,
            civil_tz,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, RainfallError> {
        Self::new(
            config.rainfall.archive_url.clone(),
            config.rainfall.reporting_timezone,
            config.site.civil_timezone,
            std::time::Duration::from_secs(config.rainfall.request_timeout_secs),
        )
    }

    pub fn civil_timezone(&self) -> Tz {
        self.civil_tz
    }

    /// Hourly precipitation for the trailing `window_days` (UTC dates),
    /// stamped in the civil timezone.
    ///
    /// # Errors
    /// Any `RainfallError` from the single archive request; never an empty
    /// series.
    pub fn fetch_recent(&self, point: GeoPoint, window_days: u32) -> Result<RainfallSeries, RainfallError> {
        if window_days == 0 {
            return Err(RainfallError::InvalidParameters("window_days must be at least 1".to_string()));
        }

        let (start, end) = open_meteo::archive_window(Utc::now().date_naive(), window_days);
        let url = open_meteo::build_archive_url(&self.archive_url, point, start, end, self.reporting_tz);
        log::info!("Fetching rainfall for {},{} from {} to {}", point.latitude, point.longitude, start, end);

        let samples = open_meteo::fetch_archive(&self.client, &url, self.reporting_tz, self.civil_tz)?;
        RainfallSeries::new(RainfallSource::Live, samples)
    }

    /// Simulated daily series ending today in the civil timezone.
    pub fn simulate(&self, params: SimulationParams) -> Result<RainfallSeries, RainfallError> {
        simulate(self.civil_tz, params)
    }

    /// Live series if the archive answers, otherwise a simulated one.
    ///
    /// # Errors
    /// Only if the simulation parameters themselves are invalid.
    pub fn recent_or_simulated(
        &self,
        point: GeoPoint,
        window_days: u32,
        fallback: SimulationParams,
    ) -> Result<RainfallSeries, RainfallError> {
        match self.fetch_recent(point, window_days) {
            Ok(series) => Ok(series),
            Err(e) => {
                log::warn!("Live rainfall unavailable ({}); falling back to simulated data", e);
                self.simulate(fallback)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use chrono_tz::America::Chicago;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample(tz: Tz, y: i32, m: u32, d: u32, h: u32, mm: f64) -> RainfallSample {
        RainfallSample {
            timestamp: tz.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            precipitation_mm: mm,
        }
    }

    fn params(days: u32, min_mm: f64, max_mm: f64) -> SimulationParams {
        SimulationParams { days, min_mm, max_mm }
    }

    // --- Simulation ---------------------------------------------------------

    #[test]
    fn test_simulate_seven_days_bounds_and_order() {
        let today = date(2024, 5, 8);
        let mut rng = StdRng::seed_from_u64(7);
        let series = simulate_on(today, Chicago, params(7, 10.0, 60.0), &mut rng).unwrap();

        assert_eq!(series.len(), 7);
        assert_eq!(series.source(), RainfallSource::Simulated);
        for s in series.samples() {
            assert!((10.0..=60.0).contains(&s.precipitation_mm), "{} out of bounds", s.precipitation_mm);
            assert_eq!(s.timestamp.hour(), 0, "simulated samples are stamped at local midnight");
        }

        let dates = series.dates();
        assert_eq!(dates.len(), 7, "dates must be distinct");
        assert_eq!(dates.first(), Some(&date(2024, 5, 2)));
        assert_eq!(dates.last(), Some(&today));
        assert!(dates.windows(2).all(|w| w[1] - w[0] == Duration::days(1)), "dates must be consecutive");
    }

    #[test]
    fn test_simulate_ends_today_in_civil_timezone() {
        let series = simulate(Chicago, params(7, 10.0, 60.0)).unwrap();
        assert_eq!(series.len(), 7);
        assert_eq!(series.latest().timestamp.date_naive(), civil_today(Chicago));
        assert!(series.samples().iter().all(|s| (10.0..=60.0).contains(&s.precipitation_mm)));
    }

    #[test]
    fn test_simulate_single_day_fixed_value() {
        let mut rng = StdRng::seed_from_u64(1);
        let series = simulate_on(date(2024, 5, 8), Chicago, params(1, 5.0, 5.0), &mut rng).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.latest().precipitation_mm, 5.0);
    }

    #[test]
    fn test_simulate_is_reproducible_with_same_seed() {
        let a = simulate_on(date(2024, 5, 8), Chicago, params(5, 0.0, 100.0), &mut StdRng::seed_from_u64(42)).unwrap();
        let b = simulate_on(date(2024, 5, 8), Chicago, params(5, 0.0, 100.0), &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_simulate_across_dst_change() {
        // Chicago springs forward on 2024-03-10.
        let series = simulate_on(date(2024, 3, 12), Chicago, params(5, 1.0, 2.0), &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(series.dates(), vec![
            date(2024, 3, 8),
            date(2024, 3, 9),
            date(2024, 3, 10),
            date(2024, 3, 11),
            date(2024, 3, 12),
        ]);
    }

    #[test]
    fn test_simulate_rejects_invalid_parameters() {
        let mut rng = StdRng::seed_from_u64(0);
        let today = date(2024, 5, 8);
        for bad in [params(0, 10.0, 60.0), params(7, -1.0, 60.0), params(7, 60.0, 10.0), params(7, 0.0, f64::NAN)] {
            let result = simulate_on(today, Chicago, bad, &mut rng);
            assert!(
                matches!(result, Err(RainfallError::InvalidParameters(_))),
                "{:?} should be rejected, got {:?}",
                bad,
                result
            );
        }
    }

    #[test]
    fn test_simulate_rejects_bounds_above_ceiling() {
        let mut rng = StdRng::seed_from_u64(0);
        let today = date(2024, 5, 8);
        for bad in [params(1, 0.0, f64::MAX), params(1, 0.0, MAX_SIMULATED_MM + 1.0)] {
            assert!(bad.validate().is_err());
            let result = simulate_on(today, Chicago, bad, &mut rng);
            assert!(matches!(result, Err(RainfallError::InvalidParameters(_))), "got {:?}", result);
        }

        let series = simulate_on(today, Chicago, params(3, 0.0, MAX_SIMULATED_MM), &mut rng).unwrap();
        assert!(series.samples().iter().all(|s| (0.0..=MAX_SIMULATED_MM).contains(&s.precipitation_mm)));
    }

    // --- Series -------------------------------------------------------------

    #[test]
    fn test_series_rejects_empty() {
        let result = RainfallSeries::new(RainfallSource::Live, Vec::new());
        assert!(matches!(result, Err(RainfallError::NoData(_))));
    }

    #[test]
    fn test_series_sorts_samples() {
        let series = RainfallSeries::new(
            RainfallSource::Live,
            vec![sample(Chicago, 2024, 5, 2, 3, 1.0), sample(Chicago, 2024, 5, 1, 9, 2.0)],
        )
        .unwrap();
        assert_eq!(series.samples()[0].precipitation_mm, 2.0);
        assert_eq!(series.latest().precipitation_mm, 1.0);
    }

    #[test]
    fn test_daily_totals_and_lookup() {
        let series = RainfallSeries::new(
            RainfallSource::Live,
            vec![
                sample(Chicago, 2024, 5, 1, 1, 1.5),
                sample(Chicago, 2024, 5, 1, 13, 2.5),
                sample(Chicago, 2024, 5, 2, 6, 0.0),
                sample(Chicago, 2024, 5, 3, 22, 7.0),
            ],
        )
        .unwrap();

        assert_eq!(
            series.daily_totals(),
            vec![(date(2024, 5, 1), 4.0), (date(2024, 5, 2), 0.0), (date(2024, 5, 3), 7.0)]
        );
        assert_eq!(series.rainfall_on(date(2024, 5, 1)), Some(4.0));
        assert_eq!(series.rainfall_on(date(2024, 5, 2)), Some(0.0));
        assert_eq!(series.rainfall_on(date(2024, 5, 4)), None);
        assert_eq!(series.total_mm(), 11.0);
        assert_eq!(series.peak().precipitation_mm, 7.0);
    }

    // --- Provider -----------------------------------------------------------

    #[test]
    fn test_fetch_recent_failure_is_distinct_error() {
        let provider = RainfallProvider::new(
            "http://127.0.0.1:1/v1/archive",
            chrono_tz::UTC,
            Chicago,
            std::time::Duration::from_secs(2),
        )
        .unwrap();

        let result = provider.fetch_recent(GeoPoint::new(30.62798, -96.33441), 7);
        assert!(matches!(result, Err(RainfallError::Network(_))), "got {:?}", result);
    }

    #[test]
    fn test_fetch_recent_rejects_zero_window() {
        let provider = RainfallProvider::new("http://127.0.0.1:1", chrono_tz::UTC, Chicago, std::time::Duration::from_secs(1)).unwrap();
        let result = provider.fetch_recent(GeoPoint::new(30.6, -96.3), 0);
        assert!(matches!(result, Err(RainfallError::InvalidParameters(_))));
    }

    #[test]
    fn test_fallback_produces_simulated_series() {
        let provider = RainfallProvider::new(
            "http://127.0.0.1:1/v1/archive",
            chrono_tz::UTC,
            Chicago,
            std::time::Duration::from_secs(2),
        )
        .unwrap();

        let series = provider
            .recent_or_simulated(GeoPoint::new(30.62798, -96.33441), 7, params(3, 10.0, 20.0))
            .expect("fallback should always produce a series");

        assert_eq!(series.source(), RainfallSource::Simulated);
        assert_eq!(series.len(), 3);
    }

    /// Answers one request with `body` and reports the requested URL.
    fn stub_archive(body: &'static str) -> (String, std::sync::mpsc::Receiver<String>) {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind test server");
        let port = server.server_addr().to_ip().expect("test server should listen on TCP").port();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let _ = tx.send(request.url().to_string());
                let _ = request.respond(tiny_http::Response::from_string(body));
            }
        });

        (format!("http://127.0.0.1:{}/v1/archive", port), rx)
    }

    #[test]
    fn test_fetch_recent_builds_live_series() {
        let (url, requested) = stub_archive(crate::ingest::fixtures::fixture_hourly_utc_json());
        let provider = RainfallProvider::new(url, chrono_tz::UTC, Chicago, std::time::Duration::from_secs(5)).unwrap();

        let series = provider.fetch_recent(GeoPoint::new(30.62798, -96.33441), 7).expect("stub should answer");
        assert_eq!(series.source(), RainfallSource::Live);
        assert_eq!(series.len(), 6);
        assert_eq!(series.latest().timestamp.timezone(), Chicago);

        let (start, end) = open_meteo::archive_window(Utc::now().date_naive(), 7);
        let query = requested.recv().unwrap();
        assert!(query.starts_with("/v1/archive?"), "got {}", query);
        assert!(query.contains(&format!("start_date={}", start)), "got {}", query);
        assert!(query.contains(&format!("end_date={}", end)), "got {}", query);
    }

    #[test]
    fn test_recent_or_simulated_prefers_live_series() {
        let (url, _requested) = stub_archive(crate::ingest::fixtures::fixture_hourly_utc_json());
        let provider = RainfallProvider::new(url, chrono_tz::UTC, Chicago, std::time::Duration::from_secs(5)).unwrap();

        let series = provider
            .recent_or_simulated(GeoPoint::new(30.62798, -96.33441), 7, params(3, 10.0, 20.0))
            .unwrap();
        assert_eq!(series.source(), RainfallSource::Live);
        assert!((series.total_mm() - 8.8).abs() < 1e-9, "got {}", series.total_mm());
    }
}
