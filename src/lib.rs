/// floodsense: flood risk estimation for water infrastructure.
///
/// # Module structure
///
/// ```text
/// floodsense
/// ├── model          — shared data types (InfrastructureRecord, RiskAssessment, RainfallSample, errors)
/// ├── config         — site and data-path configuration loader (floodsense.toml)
/// ├── infrastructure — infrastructure CSV loader and type filtering
/// ├── risk           — rainfall + age risk scoring and classification
/// ├── rainfall       — RainfallSeries, simulator, and the live-or-simulated provider
/// ├── ingest
/// │   ├── open_meteo — Open-Meteo archive API: URL construction + JSON parsing
/// │   └── fixtures (test only) — representative API response payloads
/// ├── report         — CSV risk report export
/// ├── session        — caller-owned dashboard state and assessment orchestration
/// └── endpoint       — HTTP API over the same flow
/// ```

/// Public modules
pub mod config;
pub mod endpoint;
pub mod infrastructure;
pub mod ingest;
pub mod model;
pub mod rainfall;
pub mod report;
pub mod risk;
pub mod session;
