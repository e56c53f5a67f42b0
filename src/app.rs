//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - fetches and structures raw atlas data
//! - trains and persists the fitted pipeline
//! - replays persisted artifacts for predictions

use std::fs;
use std::path::Path;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::{Command, FIELD_FLAGS, FetchArgs, InspectArgs, PredictArgs, StructureArgs, SynthArgs, TrainArgs};
use crate::config::Settings;
use crate::data::{AtlasClient, SampleConfig, generate_sample};
use crate::domain::InputField;
use crate::error::AppError;
use crate::fit::FitOptions;
use crate::inference::PredictionRequest;

pub mod pipeline;

/// Entry point for the `obp` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.log_level.as_deref())?;
    let settings = Settings::from_env();

    match cli.command {
        Command::Fetch(args) => handle_fetch(args, &settings),
        Command::Structure(args) => handle_structure(args, &settings),
        Command::Synth(args) => handle_synth(args, &settings),
        Command::Train(args) => handle_train(args, &settings),
        Command::Predict(args) => handle_predict(args, &settings),
        Command::Inspect(args) => handle_inspect(args),
    }
}

/// Install the fmt subscriber. `--log-level` wins over `RUST_LOG`; default `info`.
fn init_tracing(log_level: Option<&str>) -> Result<(), AppError> {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level)
            .map_err(|e| AppError::new(2, format!("Invalid --log-level '{level}': {e}")))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| AppError::new(4, format!("Failed to install logger: {e}")))
}

fn handle_fetch(args: FetchArgs, settings: &Settings) -> Result<(), AppError> {
    let client = AtlasClient::from_settings(args.url, settings)?;
    let bytes = client.fetch_raw()?;

    let raw_path = args.output.unwrap_or_else(|| settings.output_dir.join("raw.csv"));
    write_file(&raw_path, &bytes)?;
    println!("Wrote {} bytes to {}", bytes.len(), raw_path.display());

    if args.structure {
        let structured_path = raw_path.with_file_name("structured.csv");
        let data = crate::io::raw::structure_raw(bytes.as_slice())?;
        crate::io::export::write_structured_csv(&structured_path, &data.records)?;
        print!("{}", crate::report::format_ingest_summary("Raw atlas", &data));
        println!("Wrote {}", structured_path.display());
    }
    Ok(())
}

fn handle_structure(args: StructureArgs, settings: &Settings) -> Result<(), AppError> {
    let data = crate::io::raw::load_raw(&args.input)?;
    if !data.row_errors.is_empty() {
        warn!(rejected = data.row_errors.len(), "raw rows rejected");
    }
    let output = args.output.unwrap_or_else(|| settings.output_dir.join("structured.csv"));
    crate::io::export::write_structured_csv(&output, &data.records)?;

    print!("{}", crate::report::format_ingest_summary("Raw atlas", &data));
    println!("Wrote {}", output.display());
    Ok(())
}

fn handle_synth(args: SynthArgs, settings: &Settings) -> Result<(), AppError> {
    let config = SampleConfig {
        count: args.count,
        seed: args.seed,
        intercept: args.intercept,
        slope: args.slope,
        noise_sigma: args.noise,
        missing_rate: args.missing_rate,
    };
    let records = generate_sample(&config)?;
    let output = args.output.unwrap_or_else(|| settings.output_dir.join("synthetic.csv"));
    crate::io::export::write_structured_csv(&output, &records)?;

    info!(count = records.len(), seed = config.seed, path = %output.display(), "synthetic table written");
    println!("Wrote {} synthetic counties to {}", records.len(), output.display());
    Ok(())
}

fn handle_train(args: TrainArgs, settings: &Settings) -> Result<(), AppError> {
    let config = train_config_from_args(args, settings);
    let run = pipeline::run_train(&config)?;

    print!("{}", crate::report::format_ingest_summary("Input", &run.ingest));
    println!();
    println!("{}", crate::report::format_training_summary(&run.report, &run.artifacts));
    println!("Report: {}", config.report_path.display());
    Ok(())
}

pub fn train_config_from_args(args: TrainArgs, settings: &Settings) -> pipeline::TrainConfig {
    let artifact_dir = args.artifacts.unwrap_or_else(|| settings.artifact_dir.clone());
    let report_path = args
        .report
        .unwrap_or_else(|| artifact_dir.join(pipeline::REPORT_FILE_NAME));
    pipeline::TrainConfig {
        input: args.input,
        artifact_dir,
        report_path,
        export_dir: args.export_matrices,
        options: FitOptions {
            k: args.k,
            test_fraction: args.test_fraction,
            split_seed: args.split_seed,
        },
    }
}

fn handle_predict(args: PredictArgs, settings: &Settings) -> Result<(), AppError> {
    let request = prediction_request_from_args(&args)?;
    let artifact_dir = args.artifacts.clone().unwrap_or_else(|| settings.artifact_dir.clone());
    let value = pipeline::run_predict(&artifact_dir, &request)?;

    if args.raw {
        println!("{value}");
    } else {
        println!("{}", crate::report::format_prediction(value));
    }
    Ok(())
}

/// Build the request from `--json` or from the nine per-field flags.
///
/// Every field is required; a missing flag is reported by name.
pub fn prediction_request_from_args(args: &PredictArgs) -> Result<PredictionRequest, AppError> {
    if let Some(json) = &args.json {
        return Ok(PredictionRequest::from_json(json)?);
    }

    let mut values = [0.0; 9];
    let mut missing = Vec::new();
    for ((slot, value), (flag, field)) in values
        .iter_mut()
        .zip(args.field_values())
        .zip(FIELD_FLAGS.iter().zip(InputField::ALL))
    {
        match value {
            Some(v) => *slot = v,
            None => missing.push(format!("--{} ({})", flag.replace('_', "-"), field.name())),
        }
    }
    if !missing.is_empty() {
        return Err(AppError::new(2, format!("Missing required input(s): {}", missing.join(", "))));
    }
    Ok(PredictionRequest::from_values(values))
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let json = crate::io::artifact::describe(&args.path)?;
    println!("{json}");
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display())))?;
    }
    fs::write(path, bytes).map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))
}
