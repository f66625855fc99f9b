//! FloodSense - Flood Risk Estimator
//!
//! One-shot command-line run of the dashboard flow:
//! 1. Loads the site configuration and infrastructure inventory
//! 2. Gets rainfall (live archive, simulated, or a manual value)
//! 3. Scores every selected asset and prints the risk table
//! 4. Optionally exports the CSV report or serves the HTTP API
//!
//! Usage:
//!   cargo run --release                                # Live rainfall, private wells
//!   cargo run --release -- --simulate --days 5         # Simulated 5-day series
//!   cargo run --release -- --rainfall 80 --types all   # Manual rainfall, every type
//!   cargo run --release -- --export report.csv         # Also write the CSV report
//!   cargo run --release -- --endpoint 8080             # Serve the HTTP API instead
//!
//! Environment:
//!   FLOODSENSE_CONFIG - path to the TOML config (default: floodsense.toml)
//!   RUST_LOG          - log filter (default: info)

use chrono::NaiveDate;
use floodsense::config::{self, AppConfig};
use floodsense::endpoint::{self, EndpointState};
use floodsense::infrastructure::{self, parse_type_list};
use floodsense::model::{InfrastructureRecord, InfrastructureType, RiskAssessment, RiskLevel};
use floodsense::rainfall::{RainfallProvider, RainfallSeries};
use floodsense::report;
use floodsense::risk;
use floodsense::session::{self, AssessmentOutcome, RainfallMode, ReadingSource, Session};
use std::env;
use std::process;

/// Command-line options; `None` means "use the config value".
#[derive(Debug, Default)]
struct CliOptions {
    simulate: bool,
    days: Option<u32>,
    min_mm: Option<f64>,
    max_mm: Option<f64>,
    rainfall_mm: Option<f64>,
    date: Option<NaiveDate>,
    types: Option<Vec<InfrastructureType>>,
    export: Option<String>,
    config_path: Option<String>,
    endpoint_port: Option<u16>,
}

const USAGE: &str = "[--simulate] [--days N] [--min MM] [--max MM] [--rainfall MM] \
[--date YYYY-MM-DD] [--types LIST|all] [--export [PATH]] [--config PATH] [--endpoint PORT]";

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("🌊 FloodSense Flood Risk Estimator");
    println!("==================================\n");

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Usage: {} {}", args[0], USAGE);
            process::exit(1);
        }
    };

    // Load configuration
    let config = match &options.config_path {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            process::exit(1);
        }
    };
    println!("📍 Site: {} ({}, {})", config.site.name, config.site.latitude, config.site.longitude);

    // Load infrastructure inventory
    let records = match infrastructure::load_infrastructure(&config.data.infrastructure_path) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ Failed to load {}: {}", config.data.infrastructure_path, e);
            process::exit(1);
        }
    };
    println!("🏗️  Loaded {} infrastructure records\n", records.len());

    let provider = match RainfallProvider::from_config(&config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("❌ Failed to create HTTP client: {}", e);
            process::exit(1);
        }
    };

    // Serve the HTTP API instead of a one-shot run
    if let Some(port) = options.endpoint_port {
        println!("🚀 Starting HTTP endpoint server on http://0.0.0.0:{}", port);
        println!("   Press Ctrl+C to stop\n");
        let state = EndpointState::new(config, provider, records);
        if let Err(e) = endpoint::start_endpoint_server(port, state) {
            eprintln!("❌ Endpoint server error: {}", e);
            process::exit(1);
        }
        return;
    }

    let session = match build_session(&config, &options) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("❌ {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run_once(&config, &provider, &records, session, &options) {
        eprintln!("\n❌ {}", e);
        process::exit(1);
    }
}

/// Parses everything after the program name.
fn parse_args(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--simulate" => {
                options.simulate = true;
                i += 1;
            }
            "--export" => {
                // Path is optional; a following flag means "use the default".
                match args.get(i + 1).filter(|next| !next.starts_with("--")) {
                    Some(path) => {
                        options.export = Some(path.clone());
                        i += 2;
                    }
                    None => {
                        options.export = Some(String::new());
                        i += 1;
                    }
                }
            }
            "--days" | "--min" | "--max" | "--rainfall" | "--date" | "--types" | "--config" | "--endpoint" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| format!("{} requires a value", flag))?;

                match flag {
                    "--days" => options.days = Some(parse_value(flag, value)?),
                    "--min" => options.min_mm = Some(parse_value(flag, value)?),
                    "--max" => options.max_mm = Some(parse_value(flag, value)?),
                    "--rainfall" => options.rainfall_mm = Some(parse_value(flag, value)?),
                    "--date" => options.date = Some(parse_value(flag, value)?),
                    "--types" => {
                        options.types = Some(if value.eq_ignore_ascii_case("all") {
                            InfrastructureType::ALL.to_vec()
                        } else {
                            parse_type_list(value)?
                        })
                    }
                    "--config" => options.config_path = Some(value.clone()),
                    _ => options.endpoint_port = Some(parse_value(flag, value)?),
                }
                i += 2;
            }
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    Ok(options)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| format!("invalid value '{}' for {}: {}", value, flag, e))
}

/// Session seeded from config, with command-line overrides applied.
fn build_session(config: &AppConfig, options: &CliOptions) -> Result<Session, String> {
    let mut params = config.simulation_params();
    if let Some(days) = options.days {
        params.days = days;
    }
    if let Some(min_mm) = options.min_mm {
        params.min_mm = min_mm;
    }
    if let Some(max_mm) = options.max_mm {
        params.max_mm = max_mm;
    }
    params.validate().map_err(|e| e.to_string())?;

    let mut session = Session::new(params);
    if options.simulate {
        session.set_mode(RainfallMode::Simulated);
    }
    if let Some(types) = &options.types {
        session.selected_types = types.clone();
    }
    session.selected_date = options.date;
    session.manual_rainfall_mm = options.rainfall_mm;
    session.request_run();

    Ok(session)
}

fn run_once(
    config: &AppConfig,
    provider: &RainfallProvider,
    records: &[InfrastructureRecord],
    mut session: Session,
    options: &CliOptions,
) -> Result<(), String> {
    let point = config.site_point();
    let window_days = config.rainfall.window_days;

    // Rainfall: fetch once, show the trend, then pick the value to assess
    let reading = match session.manual_rainfall_mm {
        Some(_) => {
            println!("🌧️  Using manual rainfall value");
            session
                .current_rainfall(provider, point, window_days)
                .map_err(|e| e.to_string())?
        }
        None => {
            match session.mode {
                RainfallMode::Live => println!("📥 Fetching last {} days of rainfall...", window_days),
                RainfallMode::Simulated => println!("🎲 Simulating {} days of rainfall...", session.simulation.days),
            }
            let series = session
                .rainfall_series(provider, point, window_days)
                .map_err(|e| e.to_string())?;
            print_series(&series);
            session::reading_from_series(&series, session.selected_date).map_err(|e| e.to_string())?
        }
    };

    let source = match reading.source {
        ReadingSource::Live => "live",
        ReadingSource::Simulated => "simulated",
        ReadingSource::Manual => "manual",
    };
    match reading.date {
        Some(date) => println!("\n🌧️  Rainfall: {:.1} mm on {} ({})", reading.rainfall_mm, date, source),
        None => println!("\n🌧️  Rainfall: {:.1} mm ({})", reading.rainfall_mm, source),
    }

    let selected: Vec<&str> = session.selected_types.iter().map(|t| t.label()).collect();
    println!("🔎 Infrastructure types: {}\n", selected.join(", "));

    let assessments = match session::assess_selection(&session, records, reading).map_err(|e| e.to_string())? {
        AssessmentOutcome::Assessed { assessments, .. } => assessments,
        AssessmentOutcome::NoData { .. } | AssessmentOutcome::NotRequested => {
            println!("⚠️  No infrastructure data available for the selected types");
            Vec::new()
        }
    };

    if !assessments.is_empty() {
        print_table(&assessments);
    }

    if let Some(path) = &options.export {
        let path = if path.is_empty() { config.data.report_path.as_str() } else { path.as_str() };
        report::write_report_file(&assessments, path).map_err(|e| format!("Report export failed: {}", e))?;
        println!("\n💾 Report written to {}", path);
    }

    Ok(())
}

fn print_series(series: &RainfallSeries) {
    let peak = series.peak();
    println!(
        "   {} samples, total {:.1} mm, peak {:.1} mm at {}",
        series.len(),
        series.total_mm(),
        peak.precipitation_mm,
        peak.timestamp.format("%Y-%m-%d %H:%M %Z")
    );
    for (date, total) in series.daily_totals() {
        println!("   {}  {:>6.1} mm", date, total);
    }
}

fn print_table(assessments: &[RiskAssessment]) {
    println!(
        "{:<32} {:<16} {:>6} {:>7} {:<9} {}",
        "Name", "Type", "Age", "Score", "Risk", "Recommendation"
    );
    println!("{}", "-".repeat(100));
    for a in assessments {
        println!(
            "{:<32} {:<16} {:>6.1} {:>7.3} {:<9} {}",
            a.record.name,
            a.record.kind.label(),
            a.record.age,
            a.risk_score,
            a.risk_level.label(),
            a.recommendation
        );
    }

    println!();
    for (level, count) in risk::summarize(assessments) {
        let icon = match level {
            RiskLevel::Low => "🟢",
            RiskLevel::Moderate => "🟡",
            RiskLevel::High => "🔴",
        };
        println!("{} {}: {}", icon, level, count);
    }
}
