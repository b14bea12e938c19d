//! Levenberg-Marquardt fit of one Sharpe-Schoolfield variant from one start.
//!
//! Given:
//! - a validated curve `(T_i, trait_i)`
//! - a starting [`ParameterSet`] (values + optimizer domains + `vary` flags)
//!
//! we:
//! - log-transform the traits once (private working copy)
//! - map the free parameters onto unconstrained internal coordinates
//! - minimize `Σ r_i²` with `r_i = exp(model(T_i)) - ln(trait_i)`
//! - accept the solution only if the optimizer converged and the Jacobian at
//!   the solution still identifies the parameters
//!
//! Any failure is returned as a [`FitFailure`] value; the caller decides
//! whether to skip the attempt.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt, TerminationReason};
use nalgebra::storage::Owned;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::domain::{Curve, FitResult, FittedModel, ModelKind, ParamName, ParameterSet};
use crate::error::{FitFailure, TpcError};
use crate::math::{from_internal, numerical_rank, to_internal};
use crate::models::{Coefficients, ModelConstants, effective_params, predict, residuals};

/// Step and function tolerance.
pub const DEFAULT_TOL: f64 = 1e-12;

/// Residual-evaluation cap per attempt.
pub const DEFAULT_MAX_EVALS: usize = 100_000;

/// Jacobian rank a solution needs: the Arrhenius intercept and slope.
const MIN_IDENTIFIABLE_RANK: usize = 2;

/// Floor on `chisqr / n` inside the AIC logarithm.
const CHISQR_FLOOR: f64 = 1e-250;

/// Optimizer settings for one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Upper bound on residual evaluations.
    pub max_evals: usize,
    pub constants: ModelConstants,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            ftol: DEFAULT_TOL,
            xtol: DEFAULT_TOL,
            gtol: 0.0,
            max_evals: DEFAULT_MAX_EVALS,
            constants: ModelConstants::default(),
        }
    }
}

/// Least-squares problem in internal (unconstrained) coordinates.
struct SchoolfieldProblem<'a> {
    model: ModelKind,
    temps: &'a [f64],
    log_traits: &'a [f64],
    /// Start values and domains; fixed parameters are read from here.
    start: &'a ParameterSet,
    free: Vec<ParamName>,
    constants: ModelConstants,
    /// Residual rows, padded with zeros up to the number of free parameters.
    rows: usize,
    internal: DVector<f64>,
}

impl<'a> SchoolfieldProblem<'a> {
    fn new(
        model: ModelKind,
        temps: &'a [f64],
        log_traits: &'a [f64],
        start: &'a ParameterSet,
        constants: ModelConstants,
    ) -> Self {
        let free = start.free_names();
        let internal = DVector::from_iterator(
            free.len(),
            free.iter().map(|&name| match start.get(name) {
                Some(p) => to_internal(p.value, p.min, p.max),
                None => f64::NAN,
            }),
        );
        Self {
            model,
            temps,
            log_traits,
            start,
            rows: temps.len().max(free.len()),
            free,
            constants,
            internal,
        }
    }

    /// Model-space parameter set for an internal vector.
    fn external(&self, internal: &DVector<f64>) -> ParameterSet {
        let mut set = self.start.clone();
        for (&name, &u) in self.free.iter().zip(internal.iter()) {
            if let Some(p) = self.start.get(name) {
                set = set.with_value(name, from_internal(u, p.min, p.max));
            }
        }
        set
    }

    fn residuals_at(&self, internal: &DVector<f64>) -> Option<DVector<f64>> {
        let params = self.external(internal);
        let r = residuals(self.model, &params, self.temps, self.log_traits, &self.constants).ok()?;
        if r.iter().any(|v| !v.is_finite()) {
            return None;
        }
        Some(DVector::from_iterator(
            self.rows,
            r.into_iter().chain(std::iter::repeat(0.0)).take(self.rows),
        ))
    }

    /// Forward-difference Jacobian in internal coordinates.
    fn jacobian_at(&self, internal: &DVector<f64>) -> Option<DMatrix<f64>> {
        let base = self.residuals_at(internal)?;
        let eps = f64::EPSILON.sqrt();
        let mut jac = DMatrix::zeros(self.rows, internal.len());
        for j in 0..internal.len() {
            let mut x = internal.clone();
            let h = match eps * x[j].abs() {
                h if h == 0.0 => eps,
                h => h,
            };
            x[j] += h;
            let r = self.residuals_at(&x)?;
            jac.set_column(j, &((r - &base) / h));
        }
        Some(jac)
    }
}

impl LeastSquaresProblem<f64, Dyn, Dyn> for SchoolfieldProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, Dyn>;
    type ParameterStorage = Owned<f64, Dyn>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.internal.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.internal.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        self.residuals_at(&self.internal)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        self.jacobian_at(&self.internal)
    }
}

/// Akaike Information Criterion for a least-squares fit:
/// `n·ln(chisqr/n) + 2k`.
pub fn aic(n: usize, chisqr: f64, n_free: usize) -> f64 {
    let n_f = n as f64;
    let chisqr = chisqr.max(CHISQR_FLOOR * n_f);
    n_f * (chisqr / n_f).ln() + 2.0 * n_free as f64
}

fn converged(termination: &TerminationReason) -> bool {
    // "No improvement possible" means the tolerances sit at machine precision
    // for this problem; the point reached is as good as the solver can do.
    termination.was_successful() || matches!(termination, TerminationReason::NoImprovementPossible(_))
}

fn termination_failure(termination: TerminationReason, n_evals: usize) -> FitFailure {
    match termination {
        TerminationReason::LostPatience => {
            FitFailure::NotConverged(format!("evaluation cap reached after {n_evals} evaluations"))
        }
        TerminationReason::Numerical(what) => FitFailure::Numerical(format!("breakdown in {what}")),
        TerminationReason::User(what) => FitFailure::Numerical(format!("non-finite {what} during optimization")),
        other => FitFailure::NotConverged(format!("{other:?} after {n_evals} evaluations")),
    }
}

/// Fit `model` to `curve` starting from `start`.
pub fn fit_model(
    model: ModelKind,
    curve: &Curve,
    start: &ParameterSet,
    opts: &FitOptions,
) -> Result<FittedModel, FitFailure> {
    let log_traits = curve.log_traits();
    let problem = SchoolfieldProblem::new(model, curve.temps(), &log_traits, start, opts.constants);
    let n_free = problem.free.len();

    let patience = (opts.max_evals / (n_free + 1)).max(1);
    let solver = LevenbergMarquardt::new()
        .with_ftol(opts.ftol)
        .with_xtol(opts.xtol)
        .with_gtol(opts.gtol)
        .with_patience(patience);
    let (problem, report) = solver.minimize(problem);

    if !converged(&report.termination) {
        return Err(termination_failure(report.termination, report.number_of_evaluations));
    }

    let internal = problem.params();
    let raw = problem.external(&internal);
    let params =
        effective_params(model, &raw).map_err(|e| FitFailure::Numerical(format!("reading estimates: {e}")))?;

    let jac = problem
        .jacobian_at(&internal)
        .ok_or_else(|| FitFailure::Numerical("non-finite Jacobian at solution".into()))?;
    let rank = numerical_rank(&jac)
        .ok_or_else(|| FitFailure::Numerical("non-finite Jacobian at solution".into()))?;
    if rank < MIN_IDENTIFIABLE_RANK.min(n_free) {
        return Err(FitFailure::SingularJacobian { rank, free: n_free });
    }

    let fitted = predict(model, &params, curve.temps(), &opts.constants)
        .map_err(|e| FitFailure::Numerical(format!("forward prediction: {e}")))?;
    let chisqr: f64 = fitted
        .iter()
        .zip(&log_traits)
        .map(|(f, y)| (f - y).powi(2))
        .sum();
    if !chisqr.is_finite() {
        return Err(FitFailure::Numerical("non-finite residual sum of squares".into()));
    }

    Ok(FittedModel {
        params,
        aic: aic(curve.len(), chisqr, n_free),
        fitted,
        chisqr,
        n_evals: report.number_of_evaluations,
    })
}

/// Run one attempt and package it as a [`FitResult`].
///
/// Only a start set that lacks one of the model's parameters is an error;
/// optimizer trouble is recorded in the result.
pub fn run_attempt(
    attempt: usize,
    model: ModelKind,
    curve: &Curve,
    start: ParameterSet,
    opts: &FitOptions,
) -> Result<FitResult, TpcError> {
    Coefficients::read(model, &start)?;
    let outcome = fit_model(model, curve, &start, opts);
    Ok(FitResult {
        attempt,
        model,
        initial: start,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Parameter;
    use crate::models::default_parameters;

    fn high_truth() -> ParameterSet {
        default_parameters(ModelKind::High)
            .with_value(ParamName::B0, 1.0)
            .with_value(ParamName::E, 0.6)
            .with_value(ParamName::Eh, 2.0)
            .with_value(ParamName::Th, 305.0)
    }

    /// Traits whose log equals the model's linear prediction, so the truth
    /// has zero residuals.
    fn exact_curve(model: ModelKind, truth: &ParameterSet) -> Curve {
        let temps: Vec<f64> = (0..12).map(|i| 275.0 + 5.0 * i as f64).collect();
        let pred = predict(model, truth, &temps, &ModelConstants::default()).unwrap();
        let traits = pred.iter().map(|p| p.exp()).collect();
        Curve::new("synthetic", temps, traits).unwrap()
    }

    #[test]
    fn recovers_high_model_from_nearby_start() {
        let truth = high_truth();
        let curve = exact_curve(ModelKind::High, &truth);
        let start = truth
            .with_value(ParamName::B0, 0.8)
            .with_value(ParamName::E, 0.5)
            .with_value(ParamName::Eh, 1.8)
            .with_value(ParamName::Th, 300.0);

        let fit = fit_model(ModelKind::High, &curve, &start, &FitOptions::default()).unwrap();
        assert!(fit.chisqr < 1e-10, "chisqr {}", fit.chisqr);
        assert!(fit.aic.is_finite());
        let e = fit.params.value(ParamName::E).unwrap();
        let th = fit.params.value(ParamName::Th).unwrap();
        assert!((e - 0.6).abs() < 1e-3, "E {e}");
        assert!((th - 305.0).abs() < 0.1, "Th {th}");
    }

    #[test]
    fn prediction_round_trips_to_reported_loss() {
        let truth = high_truth();
        let clean = exact_curve(ModelKind::High, &truth);
        // Perturb the observations so the minimum is not zero.
        let traits: Vec<f64> = clean
            .traits()
            .iter()
            .enumerate()
            .map(|(i, v)| v * if i % 2 == 0 { 1.05 } else { 0.95 })
            .collect();
        let curve = Curve::new("noisy", clean.temps().to_vec(), traits).unwrap();

        let fit = fit_model(ModelKind::High, &curve, &truth, &FitOptions::default()).unwrap();
        let r = residuals(
            ModelKind::High,
            &fit.params,
            curve.temps(),
            &curve.log_traits(),
            &ModelConstants::default(),
        )
        .unwrap();
        let ssq: f64 = r.iter().map(|v| v * v).sum();
        assert!((ssq - fit.chisqr).abs() < 1e-6, "{ssq} vs {}", fit.chisqr);
        assert!(fit.chisqr > 0.0);
    }

    #[test]
    fn start_in_penalty_region_fails() {
        let curve = Curve::new(
            "c",
            vec![280.0, 290.0, 300.0, 310.0, 320.0],
            vec![0.5, 1.2, 2.0, 1.3, 0.4],
        )
        .unwrap();
        let start = default_parameters(ModelKind::Full)
            .with_value(ParamName::B0, 0.5)
            .with_value(ParamName::E, 1.1)
            .with_value(ParamName::Eh, 0.6)
            .with_value(ParamName::El, 0.3)
            .with_value(ParamName::Th, 310.0)
            .with_value(ParamName::Tl, 280.0);
        assert!(fit_model(ModelKind::Full, &curve, &start, &FitOptions::default()).is_err());
    }

    #[test]
    fn single_temperature_curve_is_singular() {
        let curve = Curve::new("flat", vec![300.0; 5], vec![1.5; 5]).unwrap();
        let start = high_truth();
        let err = fit_model(ModelKind::High, &curve, &start, &FitOptions::default()).unwrap_err();
        assert!(
            matches!(err, FitFailure::SingularJacobian { .. } | FitFailure::NotConverged(_) | FitFailure::Numerical(_)),
            "{err:?}"
        );
    }

    #[test]
    fn fixed_parameters_stay_put_and_do_not_count() {
        let truth = high_truth();
        let curve = exact_curve(ModelKind::High, &truth);
        let start = truth
            .with(ParamName::Th, Parameter::fixed(305.0))
            .with_value(ParamName::E, 0.55);
        let fit = fit_model(ModelKind::High, &curve, &start, &FitOptions::default()).unwrap();
        assert_eq!(fit.params.value(ParamName::Th), Some(305.0));
        let expected = aic(curve.len(), fit.chisqr, 3);
        assert!((fit.aic - expected).abs() < 1e-9);
    }

    #[test]
    fn run_attempt_rejects_incomplete_start() {
        let curve = Curve::new("c", vec![280.0, 290.0], vec![1.0, 2.0]).unwrap();
        let start = ParameterSet::new().with(ParamName::B0, Parameter::free(1.0));
        let err = run_attempt(0, ModelKind::Low, &curve, start, &FitOptions::default()).unwrap_err();
        assert!(matches!(err, TpcError::InvalidInput(_)));
    }

    #[test]
    fn aic_matches_closed_form() {
        let v = aic(10, 2.0, 4);
        let expected = 10.0 * (0.2_f64).ln() + 8.0;
        assert!((v - expected).abs() < 1e-12);
        // A perfect fit is floored instead of producing -inf.
        assert!(aic(5, 0.0, 6).is_finite());
    }
}
