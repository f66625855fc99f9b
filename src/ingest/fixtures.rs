/// Test fixtures: representative JSON payloads from the Open-Meteo archive API.
///
/// Truncated to a handful of hours but structurally faithful to:
///   https://archive-api.open-meteo.com/v1/archive?hourly=precipitation&timezone=UTC&...
///
/// Archive response shape:
///   response.latitude / .longitude   - grid cell actually used
///   response.timezone                - echo of the requested timezone
///   response.hourly_units.precipitation - "mm"
///   response.hourly.time[]           - "YYYY-MM-DDTHH:MM", no offset,
///                                      wall clock in the requested timezone
///   response.hourly.precipitation[]  - parallel array of numbers or null
///
/// The archive publishes with a lag of several days; hours it has not yet
/// filled in come back as `null`, not as a missing entry.

/// Six hours of UTC data straddling midnight UTC on 2024-05-01, which is
/// 19:00-00:00 CDT (UTC-5) on 2024-04-30 in College Station.
pub(crate) fn fixture_hourly_utc_json() -> &'static str {
    r#"{
      "latitude": 30.6,
      "longitude": -96.3,
      "generationtime_ms": 0.41,
      "utc_offset_seconds": 0,
      "timezone": "UTC",
      "timezone_abbreviation": "UTC",
      "elevation": 103.0,
      "hourly_units": { "time": "iso8601", "precipitation": "mm" },
      "hourly": {
        "time": [
          "2024-05-01T00:00",
          "2024-05-01T01:00",
          "2024-05-01T02:00",
          "2024-05-01T03:00",
          "2024-05-01T04:00",
          "2024-05-01T05:00"
        ],
        "precipitation": [0.0, 1.2, 4.8, 2.5, 0.3, 0.0]
      }
    }"#
}

/// Trailing hours not yet published by the archive (null precipitation).
pub(crate) fn fixture_trailing_nulls_json() -> &'static str {
    r#"{
      "latitude": 30.6,
      "longitude": -96.3,
      "timezone": "UTC",
      "hourly_units": { "time": "iso8601", "precipitation": "mm" },
      "hourly": {
        "time": ["2024-05-01T00:00", "2024-05-01T01:00", "2024-05-01T02:00", "2024-05-01T03:00"],
        "precipitation": [0.5, 2.0, null, null]
      }
    }"#
}

/// Every hour in the window is still unpublished.
pub(crate) fn fixture_all_null_json() -> &'static str {
    r#"{
      "latitude": 30.6,
      "longitude": -96.3,
      "timezone": "UTC",
      "hourly": {
        "time": ["2024-05-01T00:00", "2024-05-01T01:00"],
        "precipitation": [null, null]
      }
    }"#
}

/// Structurally valid but empty arrays.
pub(crate) fn fixture_empty_arrays_json() -> &'static str {
    r#"{
      "latitude": 30.6,
      "longitude": -96.3,
      "timezone": "UTC",
      "hourly": { "time": [], "precipitation": [] }
    }"#
}

/// `time` and `precipitation` disagree in length.
pub(crate) fn fixture_mismatched_lengths_json() -> &'static str {
    r#"{
      "hourly": {
        "time": ["2024-05-01T00:00", "2024-05-01T01:00", "2024-05-01T02:00"],
        "precipitation": [0.1, 0.2]
      }
    }"#
}

/// Archive error body (returned with HTTP 400 for bad parameters).
pub(crate) fn fixture_error_body_json() -> &'static str {
    r#"{ "error": true, "reason": "Parameter 'start_date' is out of allowed range" }"#
}

/// Local-time response (timezone=America/Chicago requested) spanning the
/// 2024-03-10 spring-forward gap, where 02:00 does not exist.
pub(crate) fn fixture_chicago_dst_gap_json() -> &'static str {
    r#"{
      "timezone": "America/Chicago",
      "hourly": {
        "time": ["2024-03-10T01:00", "2024-03-10T03:00", "2024-03-10T04:00"],
        "precipitation": [0.4, 0.0, 1.1]
      }
    }"#
}
