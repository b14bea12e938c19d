//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! CSV ingest -> template + bounds -> resampled fit per curve
//!
//! The CLI layer can then focus on presentation and exports.

use tracing::info;

use crate::domain::{BoundsSpec, CurveOutcome, FitConfig, ParameterSet};
use crate::error::{AppError, TpcError};
use crate::fit::{FitOptions, ResampleOptions, resample_fit, validate_bounds};
use crate::io::ingest::{PreparedData, load_bounds_json, load_curves};
use crate::models::{ModelConstants, default_bounds, default_parameters};

/// All computed outputs of a single `tpcfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub data: PreparedData,
    pub outcomes: Vec<CurveOutcome>,
}

impl RunOutput {
    pub fn fitted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.best().is_some()).count()
    }
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let data = load_curves(&config.csv_path, &config.prep)?;
    let (template, bounds) = resolve_inputs(config)?;
    let opts = resample_options(config)?;
    let outcomes = fit_curves(&data, &template, &bounds, config, &opts)?;
    Ok(RunOutput { data, outcomes })
}

/// Template and sampling bounds for the configured variant.
fn resolve_inputs(config: &FitConfig) -> Result<(ParameterSet, BoundsSpec), AppError> {
    let template = default_parameters(config.model);
    let bounds = match &config.bounds_path {
        Some(path) => load_bounds_json(path)?,
        None => default_bounds(config.model),
    };
    validate_bounds(&template, &bounds)?;
    Ok((template, bounds))
}

fn resample_options(config: &FitConfig) -> Result<ResampleOptions, AppError> {
    if !(config.tref.is_finite() && config.tref > 0.0) {
        return Err(AppError::new(2, format!("Invalid --tref {} (must be a positive temperature in K).", config.tref)));
    }
    if config.attempts == 0 {
        return Err(AppError::new(2, "--attempts must be at least 1."));
    }
    Ok(ResampleOptions {
        attempts: config.attempts,
        seed: config.seed,
        parallel: config.parallel,
        fit: FitOptions {
            constants: ModelConstants::with_tref(config.tref),
            ..FitOptions::default()
        },
    })
}

/// Fit each curve in turn. A curve that never converges is recorded and the
/// run continues; configuration errors abort.
pub fn fit_curves(
    data: &PreparedData,
    template: &ParameterSet,
    bounds: &BoundsSpec,
    config: &FitConfig,
    opts: &ResampleOptions,
) -> Result<Vec<CurveOutcome>, AppError> {
    let mut outcomes = Vec::with_capacity(data.curves.len());
    for curve in &data.curves {
        let result = match resample_fit(curve, config.model, template, bounds, opts) {
            Ok(best) => Ok(best),
            Err(err @ TpcError::NoConvergence { .. }) => Err(err),
            Err(err) => return Err(err.into()),
        };
        outcomes.push(CurveOutcome {
            curve: curve.clone(),
            result,
        });
    }

    let fitted = outcomes.iter().filter(|o| o.best().is_some()).count();
    info!(curves = outcomes.len(), fitted, model = config.model.model_name(), "fit run complete");
    Ok(outcomes)
}
