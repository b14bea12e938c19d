//! Command-line parsing for the thermal performance curve fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelKind;
use crate::fit::DEFAULT_ATTEMPTS;
use crate::models::DEFAULT_TREF;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tpcfit", version, about = "Sharpe-Schoolfield thermal performance curve fitter")]
pub struct Cli {
    /// Enable debug logging (per-attempt diagnostics on stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every curve in a CSV and report the minimum-AIC fit of each.
    Fit(FitArgs),
    /// Prepare a raw CSV (unit conversion, offsets) and write the cleaned table.
    Clean(CleanArgs),
}

/// Column layout and curve selection shared by `fit` and `clean`.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Input CSV (one observation per row).
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Curve id column.
    #[arg(long, default_value = "originalid")]
    pub id_col: String,

    /// Trait value column.
    #[arg(long, default_value = "standardisedtraitvalue")]
    pub trait_col: String,

    /// Only process this curve id (repeatable).
    #[arg(long = "curve", value_name = "ID")]
    pub curves: Vec<String>,
}

/// Options for fitting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Temperature column (Kelvin unless `--celsius`).
    #[arg(long, default_value = "interactor1K")]
    pub temp_col: String,

    /// Temperatures are in Celsius (adds 273.15).
    #[arg(long)]
    pub celsius: bool,

    /// Convert trait values from per-second to per-day (x86400).
    #[arg(long)]
    pub per_second: bool,

    /// Model variant.
    #[arg(short, long, value_enum, default_value_t = ModelKind::Full)]
    pub model: ModelKind,

    /// Sampling bounds JSON, e.g. {"E": [0.05, 0.85], ...}.
    #[arg(long, value_name = "JSON")]
    pub bounds: Option<PathBuf>,

    /// Random restarts per curve.
    #[arg(short = 'n', long, default_value_t = DEFAULT_ATTEMPTS)]
    pub attempts: usize,

    /// Master seed (random when omitted).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Reference temperature (K).
    #[arg(long, default_value_t = DEFAULT_TREF)]
    pub tref: f64,

    /// Run attempts one after another instead of on the worker pool.
    #[arg(long)]
    pub sequential: bool,

    /// Print the point-by-point table of every fitted curve.
    #[arg(long)]
    pub detail: bool,

    /// Export per-curve results to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export fitted curves (estimates + fitted values) to JSON.
    #[arg(long = "export-curve")]
    pub export_curve: Option<PathBuf>,
}

/// Options for data cleaning.
#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Temperature column (Celsius unless `--kelvin`).
    #[arg(long, default_value = "interactor1temp")]
    pub temp_col: String,

    /// Temperatures are already in Kelvin (skip the +273.15 conversion).
    #[arg(long)]
    pub kelvin: bool,

    /// Trait values are already per day (skip the x86400 conversion).
    #[arg(long)]
    pub per_day: bool,

    /// Cleaned CSV output path.
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["tpcfit", "fit", "--csv", "d.csv"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(!cli.verbose);
        assert_eq!(args.model, ModelKind::Full);
        assert_eq!(args.attempts, 5);
        assert_eq!(args.seed, None);
        assert!((args.tref - 283.15).abs() < 1e-12);
        assert_eq!(args.input.id_col, "originalid");
        assert_eq!(args.temp_col, "interactor1K");
        assert!(!args.celsius && !args.per_second);
        assert!(args.input.curves.is_empty());
    }

    #[test]
    fn fit_flags() {
        let cli = Cli::parse_from([
            "tpcfit", "-v", "fit", "--csv", "d.csv", "--model", "low", "-n", "12", "--seed", "42", "--curve", "a",
            "--curve", "b", "--sequential",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert!(cli.verbose);
        assert_eq!(args.model, ModelKind::Low);
        assert_eq!(args.attempts, 12);
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.input.curves, ["a", "b"]);
        assert!(args.sequential);
    }

    #[test]
    fn clean_requires_output() {
        assert!(Cli::try_parse_from(["tpcfit", "clean", "--csv", "d.csv"]).is_err());
        let cli = Cli::parse_from(["tpcfit", "clean", "--csv", "d.csv", "-o", "out.csv", "--kelvin"]);
        assert!(matches!(cli.command, Command::Clean(ref a) if a.kelvin && !a.per_day));
    }

    #[test]
    fn clean_defaults_to_raw_columns() {
        let cli = Cli::parse_from(["tpcfit", "clean", "--csv", "d.csv", "-o", "out.csv"]);
        let Command::Clean(args) = cli.command else {
            panic!("expected clean");
        };
        assert_eq!(args.temp_col, "interactor1temp");
        assert!(!args.kelvin && !args.per_day);
    }
}
