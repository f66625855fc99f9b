/// HTTP endpoint for the flood risk dashboard
///
/// Provides a small REST API so a browser front end (or curl) can drive the
/// same flow as the CLI: pick a rainfall source, run the assessment, and
/// download the report. Requests are handled one at a time; the server owns
/// a single `Session`, so a simulated series stays put until `/reset`.
///
/// Endpoints:
/// - GET /health - Service health check
/// - GET /rainfall?mode=live|simulated&days=&min=&max= - Rainfall series
/// - GET /risk?rainfall=&date=&types= - Risk assessments (JSON)
/// - GET /report.csv?rainfall=&date=&types= - Risk assessments (CSV)
/// - GET /reset - Clear the session

use crate::config::AppConfig;
use crate::infrastructure::parse_type_list;
use crate::model::{InfrastructureRecord, RainfallError, RiskAssessment};
use crate::rainfall::{RainfallProvider, SimulationParams};
use crate::report;
use crate::risk;
use crate::session::{AssessmentOutcome, RainfallMode, Session, SessionError, run_assessment};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the server needs between requests.
pub struct EndpointState {
    pub config: AppConfig,
    pub provider: RainfallProvider,
    pub records: Vec<InfrastructureRecord>,
    pub session: Session,
}

impl EndpointState {
    pub fn new(config: AppConfig, provider: RainfallProvider, records: Vec<InfrastructureRecord>) -> Self {
        let session = Session::new(config.simulation_params());
        Self {
            config,
            provider,
            records,
            session,
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Transport-neutral response, converted to a tiny_http response at the edge.
#[derive(Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl ApiResponse {
    fn json(status: u16, value: serde_json::Value) -> Self {
        let body = serde_json::to_vec_pretty(&value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, serde_json::json!({ "error": message.into() }))
    }
}

/// Per-date total for trend display.
#[derive(Debug, Serialize)]
struct DailyTotal {
    date: NaiveDate,
    rainfall_mm: f64,
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request URL (path plus query string).
pub fn handle_request(state: &mut EndpointState, url: &str) -> ApiResponse {
    let (path, query) = split_url(url);

    match path {
        "/health" => handle_health(state),
        "/rainfall" => handle_rainfall(state, &query),
        "/risk" => handle_risk(state, &query, false),
        "/report.csv" => handle_risk(state, &query, true),
        "/reset" => {
            state.session.reset();
            ApiResponse::json(200, serde_json::json!({ "status": "reset" }))
        }
        _ => ApiResponse::json(
            404,
            serde_json::json!({
                "error": "Not found",
                "available_endpoints": ["/health", "/rainfall", "/risk", "/report.csv", "/reset"]
            }),
        ),
    }
}

/// Handle /health endpoint
fn handle_health(state: &EndpointState) -> ApiResponse {
    ApiResponse::json(
        200,
        serde_json::json!({
            "status": "ok",
            "service": "floodsense",
            "version": env!("CARGO_PKG_VERSION"),
            "site": state.config.site.name,
            "infrastructure_records": state.records.len(),
        }),
    )
}

/// Handle /rainfall endpoint
fn handle_rainfall(state: &mut EndpointState, query: &HashMap<String, String>) -> ApiResponse {
    if let Err(response) = apply_rainfall_params(&mut state.session, query) {
        return response;
    }

    let point = state.config.site_point();
    let window_days = state.config.rainfall.window_days;

    match state.session.rainfall_series(&state.provider, point, window_days) {
        Ok(series) => {
            let daily: Vec<DailyTotal> = series
                .daily_totals()
                .into_iter()
                .map(|(date, rainfall_mm)| DailyTotal { date, rainfall_mm })
                .collect();

            ApiResponse::json(
                200,
                serde_json::json!({
                    "site": state.config.site.name,
                    "mode": state.session.mode,
                    "series": series,
                    "daily_totals": daily,
                    "total_mm": series.total_mm(),
                }),
            )
        }
        Err(e) => rainfall_error_response(&e),
    }
}

/// Handle /risk and /report.csv endpoints
fn handle_risk(state: &mut EndpointState, query: &HashMap<String, String>, as_csv: bool) -> ApiResponse {
    if let Err(response) = apply_rainfall_params(&mut state.session, query) {
        return response;
    }
    if let Err(response) = apply_selection_params(&mut state.session, query) {
        return response;
    }

    state.session.request_run();
    let point = state.config.site_point();
    let window_days = state.config.rainfall.window_days;

    let outcome = match run_assessment(&mut state.session, &state.provider, point, window_days, &state.records) {
        Ok(outcome) => outcome,
        Err(SessionError::Rainfall(e)) => return rainfall_error_response(&e),
        Err(e) => return ApiResponse::error(400, e.to_string()),
    };

    if as_csv {
        let assessments: &[RiskAssessment] = match &outcome {
            AssessmentOutcome::Assessed { assessments, .. } => assessments,
            _ => &[],
        };
        return match report::report_to_bytes(assessments) {
            Ok(body) => ApiResponse {
                status: 200,
                content_type: "text/csv; charset=utf-8",
                body,
            },
            Err(e) => ApiResponse::error(500, e.to_string()),
        };
    }

    let summary = match &outcome {
        AssessmentOutcome::Assessed { assessments, .. } => risk::summarize(assessments),
        _ => risk::summarize(&[]),
    };

    ApiResponse::json(
        200,
        serde_json::json!({
            "site": state.config.site.name,
            "outcome": outcome,
            "summary": summary,
        }),
    )
}

// ---------------------------------------------------------------------------
// Query handling
// ---------------------------------------------------------------------------

/// Applies `mode`, `days`, `min`, `max` to the session.
fn apply_rainfall_params(session: &mut Session, query: &HashMap<String, String>) -> Result<(), ApiResponse> {
    if let Some(mode) = query.get("mode") {
        let mode = match mode.as_str() {
            "live" => RainfallMode::Live,
            "simulated" => RainfallMode::Simulated,
            other => return Err(ApiResponse::error(400, format!("unknown mode '{}'", other))),
        };
        session.set_mode(mode);
    }

    let current = session.simulation;
    let params = SimulationParams {
        days: parse_param(query, "days")?.unwrap_or(current.days),
        min_mm: parse_param(query, "min")?.unwrap_or(current.min_mm),
        max_mm: parse_param(query, "max")?.unwrap_or(current.max_mm),
    };
    params
        .validate()
        .map_err(|e| ApiResponse::error(400, e.to_string()))?;
    session.set_simulation(params);

    Ok(())
}

/// Applies `rainfall`, `date`, `types` to the session. An absent `rainfall`
/// or `date` clears that override; an absent `types` keeps the current
/// selection.
fn apply_selection_params(session: &mut Session, query: &HashMap<String, String>) -> Result<(), ApiResponse> {
    session.manual_rainfall_mm = parse_param(query, "rainfall")?;
    session.selected_date = parse_param(query, "date")?;

    if let Some(types) = query.get("types") {
        session.selected_types = parse_type_list(types).map_err(|e| ApiResponse::error(400, e))?;
    }

    Ok(())
}

fn parse_param<T: std::str::FromStr>(query: &HashMap<String, String>, key: &str) -> Result<Option<T>, ApiResponse>
where
    T::Err: std::fmt::Display,
{
    match query.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| ApiResponse::error(400, format!("invalid '{}' value '{}': {}", key, raw, e))),
    }
}

fn rainfall_error_response(error: &RainfallError) -> ApiResponse {
    let status = match error {
        RainfallError::InvalidParameters(_) => 400,
        _ => 502,
    };
    ApiResponse::error(status, error.to_string())
}

/// Splits `/path?a=1&b=2` into the path and decoded query pairs.
fn split_url(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    let pairs = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect();

    (path, pairs)
}

fn decode_component(text: &str) -> String {
    let spaced = text.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port
pub fn start_endpoint_server(port: u16, mut state: EndpointState) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;

    log::info!("HTTP endpoint listening on http://0.0.0.0:{}", port);

    for request in server.incoming_requests() {
        if *request.method() != tiny_http::Method::Get {
            let response = to_tiny_response(ApiResponse::error(405, "only GET is supported"));
            if let Err(e) = request.respond(response) {
                log::warn!("Failed to send response: {}", e);
            }
            continue;
        }

        let api_response = handle_request(&mut state, request.url());
        log::debug!("{} {} -> {}", request.method(), request.url(), api_response.status);

        if let Err(e) = request.respond(to_tiny_response(api_response)) {
            log::warn!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Create HTTP response with the given body and content type
fn to_tiny_response(response: ApiResponse) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut tiny = tiny_http::Response::from_data(response.body)
        .with_status_code(tiny_http::StatusCode::from(response.status));

    if let Ok(header) = tiny_http::Header::from_bytes(&b"Content-Type"[..], response.content_type.as_bytes()) {
        tiny.add_header(header);
    }

    tiny
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
