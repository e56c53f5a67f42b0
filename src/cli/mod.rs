//! Command-line parsing for the county obesity predictor.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/inference code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::fit::{DEFAULT_K, DEFAULT_SPLIT_SEED, DEFAULT_TEST_FRACTION};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "obp", version, about = "County obesity-rate predictor (train + replay fitted transforms)")]
pub struct Cli {
    /// Log filter (e.g. `info`, `debug`, `obesity_predictor=trace`). Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download the raw atlas as CSV (one blocking request, no retries).
    ///
    /// The URL must serve a CSV export of the atlas HEALTH sheet; the
    /// published `.xls` workbook is not read.
    Fetch(FetchArgs),
    /// Turn a raw atlas CSV into the structured table `train` reads.
    Structure(StructureArgs),
    /// Write a synthetic structured table with a known linear relationship.
    Synth(SynthArgs),
    /// Fit preprocessor, feature selector and predictor; persist artifacts.
    Train(TrainArgs),
    /// Score one county with persisted artifacts.
    Predict(PredictArgs),
    /// Print an artifact's header and payload as JSON.
    Inspect(InspectArgs),
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// URL of a CSV export of the atlas (defaults to OBESITY_DATA_URL). Not the `.xls` workbook.
    #[arg(long)]
    pub url: Option<String>,

    /// Where to write the raw CSV (defaults to `<output dir>/raw.csv`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the structured table next to it.
    #[arg(long)]
    pub structure: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StructureArgs {
    /// Raw atlas CSV.
    #[arg(value_name = "RAW_CSV")]
    pub input: PathBuf,

    /// Structured CSV to write (defaults to `<output dir>/structured.csv`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Number of counties to generate.
    #[arg(short = 'n', long, default_value_t = 200)]
    pub count: usize,

    /// RNG seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Target intercept (percentage points).
    #[arg(long, default_value_t = 4.0)]
    pub intercept: f64,

    /// Target slope on Obesity_Percentage_2012.
    #[arg(long, default_value_t = 0.9)]
    pub slope: f64,

    /// Gaussian noise on the target (percentage points).
    #[arg(long, default_value_t = 1.0)]
    pub noise: f64,

    /// Probability of blanking an input value.
    #[arg(long, default_value_t = 0.0)]
    pub missing_rate: f64,

    /// Structured CSV to write (defaults to `<output dir>/synthetic.csv`).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Structured CSV (canonical header, source units).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// Number of features to keep.
    #[arg(short, long, default_value_t = DEFAULT_K)]
    pub k: usize,

    /// Held-out fraction for evaluation.
    #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
    pub test_fraction: f64,

    /// Seed for the train/test shuffle.
    #[arg(long, default_value_t = DEFAULT_SPLIT_SEED)]
    pub split_seed: u64,

    /// Artifact directory (defaults to OBESITY_ARTIFACT_DIR or `models`).
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Training report JSON (defaults to `<artifact dir>/training_report.json`).
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Export the preprocessed and selected training matrices as CSV into this directory.
    #[arg(long, value_name = "DIR")]
    pub export_matrices: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Artifact directory (defaults to OBESITY_ARTIFACT_DIR or `models`).
    #[arg(long)]
    pub artifacts: Option<PathBuf>,

    /// Request as a JSON object keyed by canonical field names.
    #[arg(long, conflicts_with_all = FIELD_FLAGS)]
    pub json: Option<String>,

    /// Print only the number (fraction units).
    #[arg(long)]
    pub raw: bool,

    #[arg(long)]
    pub diabetes_2008: Option<f64>,
    #[arg(long)]
    pub diabetes_2013: Option<f64>,
    #[arg(long)]
    pub obesity_2012: Option<f64>,
    #[arg(long)]
    pub facilities_2011: Option<f64>,
    #[arg(long)]
    pub facilities_2016: Option<f64>,
    #[arg(long)]
    pub facilities_per_1000_2011: Option<f64>,
    #[arg(long)]
    pub facilities_per_1000_2016: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub facilities_change: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub facilities_per_1000_change: Option<f64>,
}

/// Per-field flags, in canonical order.
pub const FIELD_FLAGS: [&str; 9] = [
    "diabetes_2008",
    "diabetes_2013",
    "obesity_2012",
    "facilities_2011",
    "facilities_2016",
    "facilities_per_1000_2011",
    "facilities_per_1000_2016",
    "facilities_change",
    "facilities_per_1000_change",
];

impl PredictArgs {
    /// Per-field values in canonical order.
    pub fn field_values(&self) -> [Option<f64>; 9] {
        [
            self.diabetes_2008,
            self.diabetes_2013,
            self.obesity_2012,
            self.facilities_2011,
            self.facilities_2016,
            self.facilities_per_1000_2011,
            self.facilities_per_1000_2016,
            self.facilities_change,
            self.facilities_per_1000_change,
        ]
    }
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    /// Artifact file (`*.bin`).
    #[arg(value_name = "ARTIFACT")]
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn predict_flags_map_to_canonical_order() {
        let cli = Cli::parse_from([
            "obp",
            "predict",
            "--obesity-2012",
            "30",
            "--facilities-change",
            "-12.5",
        ]);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let values = args.field_values();
        assert_eq!(values[2], Some(30.0));
        assert_eq!(values[7], Some(-12.5));
        assert_eq!(values[0], None);
    }

    #[test]
    fn train_defaults() {
        let cli = Cli::parse_from(["obp", "--log-level", "debug", "train", "data/structured.csv"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.k, DEFAULT_K);
        assert_eq!(args.split_seed, 42);
    }

    #[test]
    fn fetch_help_says_the_url_must_be_csv() {
        let cmd = Cli::command();
        let fetch = cmd.find_subcommand("fetch").unwrap();
        let url = fetch.get_arguments().find(|a| a.get_id() == "url").unwrap();
        let help = url.get_help().unwrap().to_string();
        assert!(help.contains("CSV export"), "{help}");
    }
}
