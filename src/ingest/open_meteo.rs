/// Open-Meteo historical weather archive client.
///
/// Handles URL construction, JSON parsing, and the single blocking fetch for
/// hourly precipitation at one point:
///   https://archive-api.open-meteo.com/v1/archive
///
/// The archive reports wall-clock timestamps (no offset) in whatever
/// timezone the request names. Parsing interprets them in that reporting
/// timezone and converts each one to the civil timezone, so everything
/// downstream holds timezone-aware instants. See `fixtures.rs` for annotated
/// response examples.

use crate::model::{GeoPoint, RainfallError, RainfallSample};
use chrono::{Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Deserialize;

pub const ARCHIVE_BASE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ArchiveResponse {
    hourly: HourlyBlock,
}

#[derive(Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    precipitation: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Date window `[today - window_days, today]` for a trailing fetch.
pub fn archive_window(today: NaiveDate, window_days: u32) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(i64::from(window_days)), today)
}

/// Builds an archive URL requesting hourly precipitation at `point` for the
/// inclusive date range, reported in `reporting_tz`.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use floodsense::ingest::open_meteo::{build_archive_url, ARCHIVE_BASE_URL};
/// use floodsense::model::GeoPoint;
///
/// let url = build_archive_url(
///     ARCHIVE_BASE_URL,
///     GeoPoint::new(30.62798, -96.33441),
///     NaiveDate::from_ymd_opt(2024, 4, 24).unwrap(),
///     NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
///     chrono_tz::UTC,
/// );
/// assert!(url.contains("hourly=precipitation"));
/// ```
pub fn build_archive_url(
    base_url: &str,
    point: GeoPoint,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reporting_tz: Tz,
) -> String {
    format!(
        "{}?latitude={}&longitude={}&start_date={}&end_date={}&hourly=precipitation&timezone={}",
        base_url,
        point.latitude,
        point.longitude,
        start_date.format("%Y-%m-%d"),
        end_date.format("%Y-%m-%d"),
        urlencoding::encode(reporting_tz.name())
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses an archive JSON body into samples stamped in `civil_tz`, sorted
/// ascending. Hours with `null` precipitation are skipped.
///
/// # Errors
/// - `RainfallError::Parse` - malformed JSON, missing `hourly` arrays,
///   arrays of different lengths, or an unreadable / nonexistent timestamp.
/// - `RainfallError::NoData` - arrays empty, or every hour is `null`.
pub fn parse_archive_response(
    json: &str,
    reporting_tz: Tz,
    civil_tz: Tz,
) -> Result<Vec<RainfallSample>, RainfallError> {
    let response: ArchiveResponse = serde_json::from_str(json)
        .map_err(|e| RainfallError::Parse(format!("JSON deserialization failed: {}", e)))?;

    let hourly = response.hourly;

    if hourly.time.len() != hourly.precipitation.len() {
        return Err(RainfallError::Parse(format!(
            "hourly.time has {} entries but hourly.precipitation has {}",
            hourly.time.len(),
            hourly.precipitation.len()
        )));
    }

    if hourly.time.is_empty() {
        return Err(RainfallError::NoData("archive returned empty hourly arrays".to_string()));
    }

    let mut samples = Vec::with_capacity(hourly.time.len());
    let mut skipped = 0usize;

    for (time, precipitation) in hourly.time.iter().zip(hourly.precipitation) {
        let Some(precipitation_mm) = precipitation else {
            skipped += 1;
            continue;
        };

        let timestamp = parse_local_timestamp(time, reporting_tz)?.with_timezone(&civil_tz);
        samples.push(RainfallSample {
            timestamp,
            precipitation_mm,
        });
    }

    if skipped > 0 {
        log::debug!("Skipped {} unpublished (null) hours in archive response", skipped);
    }

    if samples.is_empty() {
        return Err(RainfallError::NoData(format!(
            "all {} hours in the window are unpublished",
            skipped
        )));
    }

    samples.sort_by_key(|s| s.timestamp);
    Ok(samples)
}

/// Interprets an offset-less ISO 8601 timestamp as wall-clock time in `tz`.
fn parse_local_timestamp(text: &str, tz: Tz) -> Result<chrono::DateTime<Tz>, RainfallError> {
    let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| RainfallError::Parse(format!("bad timestamp '{}': {}", text, e)))?;

    // Ambiguous fall-back hours resolve to the first occurrence.
    tz.from_local_datetime(&naive).earliest().ok_or_else(|| {
        RainfallError::Parse(format!("timestamp '{}' does not exist in {}", text, tz.name()))
    })
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Performs one GET against a fully built archive URL.
///
/// No retries: the caller decides whether to fall back to simulation.
pub fn fetch_archive(
    client: &reqwest::blocking::Client,
    url: &str,
    reporting_tz: Tz,
    civil_tz: Tz,
) -> Result<Vec<RainfallSample>, RainfallError> {
    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .map_err(|e| RainfallError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RainfallError::HttpStatus(status.as_u16()));
    }

    let body = response
        .text()
        .map_err(|e| RainfallError::Network(format!("failed to read response body: {}", e)))?;

    parse_archive_response(&body, reporting_tz, civil_tz)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use chrono::{Offset, Timelike};
    use chrono_tz::America::Chicago;

    fn college_station() -> GeoPoint {
        GeoPoint::new(30.62798, -96.33441)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Serves exactly one request with the given status and body, returning
    /// the URL to hit.
    fn serve_once(status: u16, body: &'static str) -> String {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("bind test server");
        let port = server
            .server_addr()
            .to_ip()
            .expect("test server should listen on TCP")
            .port();

        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string(body).with_status_code(status);
                let _ = request.respond(response);
            }
        });

        format!("http://127.0.0.1:{}/v1/archive", port)
    }

    fn test_client() -> reqwest::blocking::Client {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap()
    }

    // --- URL construction ---------------------------------------------------

    #[test]
    fn test_window_covers_trailing_days_inclusive() {
        let (start, end) = archive_window(date(2024, 5, 8), 7);
        assert_eq!(start, date(2024, 5, 1));
        assert_eq!(end, date(2024, 5, 8));
    }

    #[test]
    fn test_build_url_includes_all_query_params() {
        let url = build_archive_url(
            ARCHIVE_BASE_URL,
            college_station(),
            date(2024, 5, 1),
            date(2024, 5, 8),
            chrono_tz::UTC,
        );
        assert!(url.starts_with("https://archive-api.open-meteo.com/v1/archive?"), "got: {}", url);
        assert!(url.contains("latitude=30.62798"));
        assert!(url.contains("longitude=-96.33441"));
        assert!(url.contains("start_date=2024-05-01"));
        assert!(url.contains("end_date=2024-05-08"));
        assert!(url.contains("hourly=precipitation"));
        assert!(url.contains("timezone=UTC"));
    }

    #[test]
    fn test_build_url_encodes_named_timezone() {
        let url = build_archive_url(ARCHIVE_BASE_URL, college_station(), date(2024, 5, 1), date(2024, 5, 2), Chicago);
        assert!(url.contains("timezone=America%2FChicago"), "slash must be encoded, got: {}", url);
    }

    // --- Parsing: happy path ------------------------------------------------

    #[test]
    fn test_parse_converts_utc_to_chicago() {
        let samples = parse_archive_response(fixture_hourly_utc_json(), chrono_tz::UTC, Chicago)
            .expect("fixture should parse");

        assert_eq!(samples.len(), 6);

        let first = &samples[0];
        assert_eq!(first.timestamp.date_naive(), date(2024, 4, 30), "00:00 UTC is the previous evening in CDT");
        assert_eq!(first.timestamp.hour(), 19);
        assert_eq!(first.timestamp.offset().fix().local_minus_utc(), -5 * 3600);
        assert_eq!(first.timestamp.timezone(), Chicago);
    }

    #[test]
    fn test_parse_keeps_values_in_order() {
        let samples = parse_archive_response(fixture_hourly_utc_json(), chrono_tz::UTC, Chicago).unwrap();
        let values: Vec<f64> = samples.iter().map(|s| s.precipitation_mm).collect();
        assert_eq!(values, vec![0.0, 1.2, 4.8, 2.5, 0.3, 0.0]);
        assert!(samples.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_parse_skips_unpublished_hours() {
        let samples = parse_archive_response(fixture_trailing_nulls_json(), chrono_tz::UTC, Chicago).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].precipitation_mm, 2.0);
    }

    #[test]
    fn test_parse_local_reporting_timezone() {
        let samples = parse_archive_response(fixture_chicago_dst_gap_json(), Chicago, Chicago).unwrap();
        // 01:00 CST (-6) then 03:00 CDT (-5): one real hour apart.
        assert_eq!((samples[1].timestamp - samples[0].timestamp).num_hours(), 1);
    }

    // --- Parsing: error and edge cases --------------------------------------

    #[test]
    fn test_parse_empty_arrays_is_no_data() {
        let result = parse_archive_response(fixture_empty_arrays_json(), chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::NoData(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_all_null_is_no_data() {
        let result = parse_archive_response(fixture_all_null_json(), chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::NoData(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_mismatched_lengths_is_parse_error() {
        let result = parse_archive_response(fixture_mismatched_lengths_json(), chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_error_body_is_parse_error() {
        let result = parse_archive_response(fixture_error_body_json(), chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))), "got {:?}", result);
    }

    #[test]
    fn test_parse_malformed_json_is_parse_error() {
        let result = parse_archive_response("{ this is not valid json }}}", chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))));
    }

    #[test]
    fn test_parse_empty_string_is_parse_error() {
        let result = parse_archive_response("", chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))));
    }

    #[test]
    fn test_parse_bad_timestamp_is_parse_error() {
        let json = r#"{ "hourly": { "time": ["yesterday"], "precipitation": [1.0] } }"#;
        let result = parse_archive_response(json, chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))));
    }

    #[test]
    fn test_parse_nonexistent_local_time_is_parse_error() {
        let json = r#"{ "hourly": { "time": ["2024-03-10T02:30"], "precipitation": [1.0] } }"#;
        let result = parse_archive_response(json, Chicago, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))), "02:30 on spring-forward day does not exist");
    }

    // --- Fetch --------------------------------------------------------------

    #[test]
    fn test_fetch_success() {
        let url = serve_once(200, fixture_hourly_utc_json());
        let samples = fetch_archive(&test_client(), &url, chrono_tz::UTC, Chicago).expect("fetch should succeed");
        assert_eq!(samples.len(), 6);
    }

    #[test]
    fn test_fetch_non_success_status() {
        let url = serve_once(400, fixture_error_body_json());
        let result = fetch_archive(&test_client(), &url, chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::HttpStatus(400))), "got {:?}", result);
    }

    #[test]
    fn test_fetch_malformed_payload() {
        let url = serve_once(200, "<html>maintenance</html>");
        let result = fetch_archive(&test_client(), &url, chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Parse(_))), "got {:?}", result);
    }

    #[test]
    fn test_fetch_connection_refused_is_network_error() {
        let result = fetch_archive(&test_client(), "http://127.0.0.1:1/v1/archive", chrono_tz::UTC, Chicago);
        assert!(matches!(result, Err(RainfallError::Network(_))), "got {:?}", result);
    }
}
