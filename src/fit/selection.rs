//! Multi-start resampling and minimum-AIC selection.
//!
//! One resampling run:
//! 1. validate the template against the model and the sampling bounds
//! 2. for each attempt `i` in `0..N`, seed an independent RNG from
//!    `(master_seed, i)`, sample a start set and run one fit
//! 3. after *all* attempts finish, keep the successes and pick the minimum AIC;
//!    ties go to the lowest attempt index
//!
//! Attempts share no mutable state, so they run on the rayon pool by default.
//! Results are collected in attempt order, which makes the outcome identical
//! to a sequential run under the same master seed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{BestFit, BoundsSpec, Curve, FitResult, ModelKind, ParameterSet};
use crate::error::TpcError;
use crate::fit::fitter::{FitOptions, run_attempt};
use crate::fit::sampler::{sample_start_params, validate_bounds};
use crate::models::Coefficients;

/// Default number of restarts per curve.
pub const DEFAULT_ATTEMPTS: usize = 5;

/// Resampling settings.
#[derive(Debug, Clone)]
pub struct ResampleOptions {
    pub attempts: usize,
    /// Master seed; drawn from the thread RNG when `None`.
    pub seed: Option<u64>,
    /// Run attempts on the rayon pool.
    pub parallel: bool,
    pub fit: FitOptions,
}

impl Default for ResampleOptions {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            seed: None,
            parallel: true,
            fit: FitOptions::default(),
        }
    }
}

/// SplitMix64 step: advance `state` by the golden gamma and finalize.
fn splitmix64(state: u64) -> u64 {
    let mut z = state.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Seed of attempt `attempt` under `master`. Stable across platforms and
/// toolchains.
pub fn attempt_seed(master: u64, attempt: usize) -> u64 {
    splitmix64(splitmix64(master).wrapping_add(attempt as u64))
}

/// Fit `curve` with `model` from `opts.attempts` random starts and return the
/// minimum-AIC success.
pub fn resample_fit(
    curve: &Curve,
    model: ModelKind,
    template: &ParameterSet,
    bounds: &BoundsSpec,
    opts: &ResampleOptions,
) -> Result<BestFit, TpcError> {
    if opts.attempts == 0 {
        return Err(TpcError::InvalidInput("attempt count must be at least 1".into()));
    }
    Coefficients::read(model, template)?;
    validate_bounds(template, bounds)?;

    let master = opts.seed.unwrap_or_else(rand::random);
    debug!(curve = curve.id(), model = model.model_name(), master_seed = master, attempts = opts.attempts, "resampling");

    let run = |attempt: usize| -> Result<FitResult, TpcError> {
        let seed = attempt_seed(master, attempt);
        let mut rng = StdRng::seed_from_u64(seed);
        let start = sample_start_params(template, bounds, &mut rng)?;
        let result = run_attempt(attempt, model, curve, start, &opts.fit)?;
        match &result.outcome {
            Ok(fit) => debug!(curve = curve.id(), attempt, seed, aic = fit.aic, evals = fit.n_evals, "attempt converged"),
            Err(failure) => warn!(curve = curve.id(), attempt, seed, %failure, "attempt discarded"),
        }
        Ok(result)
    };

    let results: Vec<FitResult> = if opts.parallel {
        (0..opts.attempts).into_par_iter().map(run).collect::<Result<_, _>>()?
    } else {
        (0..opts.attempts).map(run).collect::<Result<_, _>>()?
    };

    let successes = results.iter().filter(|r| r.is_success()).count();
    let best = select_best(&results).and_then(|r| r.outcome.as_ref().ok().map(|fit| (r, fit)));
    let Some((best, fit)) = best else {
        warn!(curve = curve.id(), attempts = opts.attempts, "no attempt converged");
        return Err(TpcError::NoConvergence {
            curve_id: curve.id().to_string(),
            attempts: opts.attempts,
        });
    };

    info!(
        curve = curve.id(),
        model = model.model_name(),
        attempt = best.attempt,
        successes,
        aic = fit.aic,
        "best fit selected"
    );

    Ok(BestFit {
        curve_id: curve.id().to_string(),
        model,
        attempt: best.attempt,
        attempts: opts.attempts,
        successes,
        initial: best.initial.clone(),
        fit: fit.clone(),
    })
}

/// Minimum-AIC successful attempt; the first one wins on equal AIC.
///
/// Attempts with a non-finite AIC are ignored.
pub fn select_best(results: &[FitResult]) -> Option<&FitResult> {
    let mut best: Option<(&FitResult, f64)> = None;
    for r in results {
        let Some(aic) = r.aic().filter(|a| a.is_finite()) else {
            continue;
        };
        match best {
            Some((_, best_aic)) if aic >= best_aic => {}
            _ => best = Some((r, aic)),
        }
    }
    best.map(|(r, _)| r)
}
