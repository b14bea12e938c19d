//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - runs ingest + resampled fitting for every curve
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{CleanArgs, Command, FitArgs, InputArgs};
use crate::domain::{FitConfig, PrepConfig};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `tpcfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Clean(args) => handle_clean(&args),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging unavailable: {e}");
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    let run = pipeline::run_fit(&config)?;

    println!("{}", crate::report::format_run_summary(&run.data, &run.outcomes, &config));
    if args.detail {
        for outcome in &run.outcomes {
            let detail = crate::report::format_curve_detail(outcome);
            if !detail.is_empty() {
                println!("{detail}");
            }
        }
    }

    // Exports are written even when some curves failed.
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, config.model, &run.outcomes)?;
    }
    if let Some(path) = &config.export_curve {
        let records: Vec<_> = run
            .outcomes
            .iter()
            .filter_map(|o| o.best().map(|best| crate::io::curve::curve_file(best, &o.curve, config.tref)))
            .collect();
        crate::io::curve::write_curve_json(path, &records)?;
    }

    if run.fitted_count() == 0 {
        return Err(AppError::new(
            3,
            format!("No curve could be fitted ({} attempted).", run.outcomes.len()),
        ));
    }
    Ok(())
}

fn handle_clean(args: &CleanArgs) -> Result<(), AppError> {
    let prep = prep_config_from_args(&args.input, &args.temp_col, !args.kelvin, !args.per_day);
    let data = crate::io::ingest::load_curves(&args.input.csv, &prep)?;
    crate::io::export::write_clean_csv(&args.output, &data.curves)?;
    print!("{}", crate::report::format_clean_summary(&data));
    println!("Wrote {}", args.output.display());
    Ok(())
}

fn prep_config_from_args(input: &InputArgs, temp_col: &str, celsius: bool, per_second: bool) -> PrepConfig {
    PrepConfig {
        id_col: input.id_col.clone(),
        temp_col: temp_col.to_string(),
        trait_col: input.trait_col.clone(),
        celsius,
        per_second,
        curve_ids: input.curves.clone(),
    }
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        csv_path: args.input.csv.clone(),
        prep: prep_config_from_args(&args.input, &args.temp_col, args.celsius, args.per_second),
        model: args.model,
        bounds_path: args.bounds.clone(),
        attempts: args.attempts,
        seed: args.seed,
        tref: args.tref,
        parallel: !args.sequential,
        export_results: args.export.clone(),
        export_curve: args.export_curve.clone(),
    }
}
