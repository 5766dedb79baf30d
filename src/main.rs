//! CourseCast - Cycling Pacing Forecaster
//!
//! CLI entry point: load a course, assemble the rider and environment from
//! flags, run the pacing optimizer, and print a report.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use coursecast::api::{
    CourseInput, EnvironmentSpec, RiderSpec, SimulationRequest, UserSegmentSpec,
};
use coursecast::sim::{SimError, SolverOptions};

/// Exit codes for the forecasting surface.
const EXIT_MALFORMED_INPUT: u8 = 64;
const EXIT_INFEASIBLE: u8 = 65;
const EXIT_NUMERICAL: u8 = 70;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cycling course pacing forecaster", long_about = None)]
struct Cli {
    /// Course file: GPX, or JSON (columnar course or full request)
    course: PathBuf,

    /// Critical power in watts
    #[arg(long, default_value_t = 250.0)]
    cp: f64,

    /// Anaerobic capacity W' in joules
    #[arg(long = "w-prime", default_value_t = 20000.0)]
    w_prime: f64,

    /// Rider mass in kg
    #[arg(long, default_value_t = 70.0)]
    mass: f64,

    /// Bike mass in kg
    #[arg(long = "bike-mass", default_value_t = 8.0)]
    bike_mass: f64,

    /// Drag area CdA in m²
    #[arg(long, default_value_t = 0.32)]
    cda: f64,

    /// Baseline rolling-resistance coefficient
    #[arg(long, default_value_t = 0.004)]
    crr: f64,

    /// Drivetrain key (e.g. ultegra, duraAce, redAxs)
    #[arg(long)]
    drivetrain: Option<String>,

    /// PDC file: JSON object of {"<seconds>": watts}
    #[arg(long)]
    pdc: Option<PathBuf>,

    /// Air temperature in °C
    #[arg(long, default_value_t = 20.0)]
    temp: f64,

    /// Course base altitude in meters
    #[arg(long, default_value_t = 0.0)]
    altitude: f64,

    /// Wind speed in m/s
    #[arg(long = "wind-speed", default_value_t = 0.0)]
    wind_speed: f64,

    /// Wind bearing in degrees (0 = from north)
    #[arg(long = "wind-deg", default_value_t = 0.0)]
    wind_deg: f64,

    /// Solver wall-clock budget in seconds
    #[arg(long = "deadline-secs")]
    deadline_secs: Option<u64>,

    /// Write the result JSON here ("-" for stdout)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(classify(&err))
        }
    }
}

fn classify(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<SimError>() {
        Some(SimError::MalformedInput(_)) | Some(SimError::EmptyCourse) => EXIT_MALFORMED_INPUT,
        Some(SimError::InfeasibleCourse { .. }) => EXIT_INFEASIBLE,
        Some(SimError::NumericalInstability(_)) | Some(SimError::DeadlineExceeded) => {
            EXIT_NUMERICAL
        }
        None => EXIT_MALFORMED_INPUT,
    }
}

fn run(cli: &Cli) -> Result<()> {
    let request = build_request(cli)?;

    let options = SolverOptions {
        deadline: cli.deadline_secs.map(Duration::from_secs),
        ..Default::default()
    };

    tracing::info!(course = %cli.course.display(), "running forecast");
    let report = coursecast::forecast(request, &options).map_err(anyhow::Error::from)?;

    print_report(&report);

    if let Some(out) = &cli.out {
        let json = serde_json::to_string_pretty(&report)?;
        if out.as_os_str() == "-" {
            println!("{json}");
        } else {
            std::fs::write(out, json)
                .with_context(|| format!("writing {}", out.display()))?;
            tracing::info!(path = %out.display(), "result saved");
        }
    }

    Ok(())
}

fn build_request(cli: &Cli) -> Result<SimulationRequest> {
    let bytes = std::fs::read(&cli.course)
        .map_err(|e| {
            anyhow::Error::from(SimError::MalformedInput(format!(
                "cannot read {}: {e}",
                cli.course.display()
            )))
        })?;

    // A JSON file holding a full request wins outright; otherwise the file
    // is just the course and the rider comes from flags.
    if is_json(&cli.course) {
        if let Ok(request) = serde_json::from_slice::<SimulationRequest>(&bytes) {
            return Ok(request);
        }
        let columnar = serde_json::from_slice(&bytes).map_err(|e| {
            anyhow::Error::from(SimError::MalformedInput(format!(
                "{} is neither a request nor a columnar course: {e}",
                cli.course.display()
            )))
        })?;
        return assemble(cli, CourseInput::Columnar(columnar));
    }

    let raw = coursecast::course::gpx::parse_gpx(&bytes)
        .map_err(SimError::from)
        .map_err(anyhow::Error::from)?;
    if let Some(name) = coursecast::course::gpx::extract_name(&bytes) {
        tracing::info!(%name, points = raw.len(), "loaded GPX course");
    }
    let points = raw
        .iter()
        .map(|p| coursecast::api::RawPointSpec {
            lat: p.latitude,
            lon: p.longitude,
            ele: p.elevation,
        })
        .collect();
    assemble(cli, CourseInput::Raw(points))
}

fn assemble(cli: &Cli, course: CourseInput) -> Result<SimulationRequest> {
    let pdc: BTreeMap<String, f64> = match &cli.pdc {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading PDC file {}", path.display()))?;
            serde_json::from_slice(&bytes).map_err(|e| {
                anyhow::Error::from(SimError::MalformedInput(format!("rider.pdc: {e}")))
            })?
        }
        None => BTreeMap::new(),
    };

    let drivetrain_key = match &cli.drivetrain {
        Some(key) => Some(
            serde_json::from_value(serde_json::Value::String(key.clone())).map_err(|_| {
                anyhow::Error::from(SimError::MalformedInput(format!(
                    "unknown drivetrain key '{key}'"
                )))
            })?,
        ),
        None => None,
    };

    Ok(SimulationRequest {
        course,
        rider: RiderSpec {
            mass_kg: cli.mass,
            cp_w: cli.cp,
            w_prime_j: cli.w_prime,
            pdc,
            cda_m2: cli.cda,
            crr: cli.crr,
            bike_mass_kg: cli.bike_mass,
            drivetrain_key,
        },
        environment: EnvironmentSpec {
            temp_c: cli.temp,
            altitude_m: cli.altitude,
            wind_speed_mps: cli.wind_speed,
            wind_bearing_deg: cli.wind_deg,
        },
        user_segments: Vec::<UserSegmentSpec>::new(),
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn print_report(report: &coursecast::SimulationReport) {
    let total = report.total_time_sec;
    let (h, m, s) = (
        (total / 3600.0) as u64,
        ((total % 3600.0) / 60.0) as u64,
        (total % 60.0) as u64,
    );

    println!("========================================");
    println!("        PACING FORECAST");
    println!("========================================");
    println!("Time         : {h}h {m}m {s}s");
    println!("Distance     : {:.1} km", report.distance_km);
    println!("Elevation    : {:.0} m gain", report.elevation_gain_m);
    println!("Avg Speed    : {:.1} km/h", report.avg_speed_kmh);
    println!("Avg Power    : {:.0} W", report.avg_power_w);
    println!("Norm Power   : {:.0} W", report.normalized_power_w);
    println!("Work         : {:.0} kJ", report.work_kj);
    println!("----------------------------------------");
    println!("Base Power   : {:.0} W", report.base_power_w);
    println!(
        "Solver       : {} iterations{}",
        report.diagnostics.solver_iterations,
        if report.diagnostics.converged {
            " (converged)"
        } else {
            " (preliminary)"
        }
    );
    if report.diagnostics.walking_distance_m > 0.0 {
        println!(
            "Walking      : {:.0} m of hike-a-bike",
            report.diagnostics.walking_distance_m
        );
    }
    if report.diagnostics.braking_distance_m > 0.0 {
        println!(
            "Braking      : {:.0} m above the descent limit",
            report.diagnostics.braking_distance_m
        );
    }
    println!("========================================");
}
