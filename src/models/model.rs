//! Sharpe-Schoolfield model evaluation for the Full / High / Low variants.
//!
//! Every variant predicts `log(trait)` in closed form:
//!
//! ```text
//! full: log( B0·exp(-E/k·(1/T - 1/Tref)) / (1 + exp(El/k·(1/Tl - 1/T)) + exp(Eh/k·(1/Th - 1/T))) )
//! high: log( B0·exp(-E/k·(1/T - 1/Tref)) / (1 + exp(Eh/k·(1/Th - 1/T))) )
//! low:  log( B0·exp(-E/k·(1/T - 1/Tref)) / (1 + exp(El/k·(1/Tl - 1/T))) )
//! ```
//!
//! The residual compares `exp(model)` against the *log-transformed* observations:
//! `r_i = exp(model(T_i)) - ln(trait_i)`.
//!
//! Domain policy, applied on every evaluation:
//! - Full and High: `E >= Eh` returns `INVALID_REGION_PENALTY` for every point.
//! - Full only: `Th` is lifted to `Tl + 1` when `Th < Tl + 1`, then `Tl` is
//!   lowered to `Th - 1` when `Tl > Th - 1`. The clamp applies to that
//!   evaluation only.

use crate::domain::{ModelKind, ParamName, ParameterSet};
use crate::error::TpcError;

/// Boltzmann's constant (eV/K).
pub const BOLTZMANN_EV: f64 = 8.617e-5;

/// Default reference temperature (K), 10 °C.
pub const DEFAULT_TREF: f64 = 283.15;

/// Residual returned for every point when `E >= Eh`.
pub const INVALID_REGION_PENALTY: f64 = 1e10;

/// Minimum separation (K) kept between `Tl` and `Th` in the full model.
const MIN_TEMP_GAP: f64 = 1.0;

/// Physical constants shared by all variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConstants {
    pub k: f64,
    pub tref: f64,
}

impl Default for ModelConstants {
    fn default() -> Self {
        Self {
            k: BOLTZMANN_EV,
            tref: DEFAULT_TREF,
        }
    }
}

impl ModelConstants {
    pub fn with_tref(tref: f64) -> Self {
        Self {
            tref,
            ..Self::default()
        }
    }
}

/// Variant coefficients read out of a [`ParameterSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficients {
    Full {
        b0: f64,
        e: f64,
        eh: f64,
        el: f64,
        th: f64,
        tl: f64,
    },
    High {
        b0: f64,
        e: f64,
        eh: f64,
        th: f64,
    },
    Low {
        b0: f64,
        e: f64,
        el: f64,
        tl: f64,
    },
}

/// Result of applying a variant's domain policy to a parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    /// Physically invalid region; residuals are the penalty constant.
    Penalty,
    /// Coefficients to evaluate the model with (clamps already applied).
    Valid(Coefficients),
}

fn require(params: &ParameterSet, name: ParamName, model: ModelKind) -> Result<f64, TpcError> {
    params.value(name).ok_or_else(|| {
        TpcError::InvalidInput(format!(
            "parameter {name} is required by the {} model but missing",
            model.model_name()
        ))
    })
}

impl Coefficients {
    /// Read the variant's parameters (no domain policy).
    pub fn read(model: ModelKind, params: &ParameterSet) -> Result<Self, TpcError> {
        let get = |name| require(params, name, model);
        Ok(match model {
            ModelKind::Full => Coefficients::Full {
                b0: get(ParamName::B0)?,
                e: get(ParamName::E)?,
                eh: get(ParamName::Eh)?,
                el: get(ParamName::El)?,
                th: get(ParamName::Th)?,
                tl: get(ParamName::Tl)?,
            },
            ModelKind::High => Coefficients::High {
                b0: get(ParamName::B0)?,
                e: get(ParamName::E)?,
                eh: get(ParamName::Eh)?,
                th: get(ParamName::Th)?,
            },
            ModelKind::Low => Coefficients::Low {
                b0: get(ParamName::B0)?,
                e: get(ParamName::E)?,
                el: get(ParamName::El)?,
                tl: get(ParamName::Tl)?,
            },
        })
    }

    /// Apply the variant's domain policy.
    pub fn evaluation(self) -> Evaluation {
        match self {
            Coefficients::Full { b0, e, eh, el, mut th, mut tl } => {
                if e >= eh {
                    return Evaluation::Penalty;
                }
                if th < tl + MIN_TEMP_GAP {
                    th = tl + MIN_TEMP_GAP;
                }
                if tl > th - MIN_TEMP_GAP {
                    tl = th - MIN_TEMP_GAP;
                }
                Evaluation::Valid(Coefficients::Full { b0, e, eh, el, th, tl })
            }
            Coefficients::High { e, eh, .. } => {
                if e >= eh {
                    Evaluation::Penalty
                } else {
                    Evaluation::Valid(self)
                }
            }
            Coefficients::Low { .. } => Evaluation::Valid(self),
        }
    }

    /// Predicted `log(trait)` at temperature `t` (K).
    pub fn log_rate(&self, t: f64, c: &ModelConstants) -> f64 {
        let k = c.k;
        let inv_t = 1.0 / t;
        match *self {
            Coefficients::Full { b0, e, eh, el, th, tl } => {
                let boltz = b0 * ((-e / k) * (inv_t - 1.0 / c.tref)).exp();
                let low = ((el / k) * (1.0 / tl - inv_t)).exp();
                let high = ((eh / k) * (1.0 / th - inv_t)).exp();
                (boltz / (1.0 + low + high)).ln()
            }
            Coefficients::High { b0, e, eh, th } => {
                let boltz = b0 * ((-e / k) * (inv_t - 1.0 / c.tref)).exp();
                let high = ((eh / k) * (1.0 / th - inv_t)).exp();
                (boltz / (1.0 + high)).ln()
            }
            Coefficients::Low { b0, e, el, tl } => {
                let boltz = b0 * ((-e / k) * (inv_t - 1.0 / c.tref)).exp();
                let low = ((el / k) * (1.0 / tl - inv_t)).exp();
                (boltz / (1.0 + low)).ln()
            }
        }
    }

    /// Write the coefficients back into a copy of `params`.
    fn apply_to(&self, params: &ParameterSet) -> ParameterSet {
        let pairs: Vec<(ParamName, f64)> = match *self {
            Coefficients::Full { b0, e, eh, el, th, tl } => vec![
                (ParamName::B0, b0),
                (ParamName::E, e),
                (ParamName::Eh, eh),
                (ParamName::El, el),
                (ParamName::Th, th),
                (ParamName::Tl, tl),
            ],
            Coefficients::High { b0, e, eh, th } => {
                vec![(ParamName::B0, b0), (ParamName::E, e), (ParamName::Eh, eh), (ParamName::Th, th)]
            }
            Coefficients::Low { b0, e, el, tl } => {
                vec![(ParamName::B0, b0), (ParamName::E, e), (ParamName::El, el), (ParamName::Tl, tl)]
            }
        };
        pairs
            .into_iter()
            .fold(params.clone(), |acc, (name, value)| acc.with_value(name, value))
    }
}

/// Residuals `exp(model(T_i)) - log_traits[i]` for one parameter set.
///
/// `log_traits` must already be log-transformed and aligned with `temps`.
pub fn residuals(
    model: ModelKind,
    params: &ParameterSet,
    temps: &[f64],
    log_traits: &[f64],
    constants: &ModelConstants,
) -> Result<Vec<f64>, TpcError> {
    if temps.len() != log_traits.len() {
        return Err(TpcError::InvalidInput(format!(
            "{} temperatures but {} trait values",
            temps.len(),
            log_traits.len()
        )));
    }
    let out = match Coefficients::read(model, params)?.evaluation() {
        Evaluation::Penalty => vec![INVALID_REGION_PENALTY; temps.len()],
        Evaluation::Valid(coeffs) => temps
            .iter()
            .zip(log_traits)
            .map(|(&t, &y)| coeffs.log_rate(t, constants).exp() - y)
            .collect(),
    };
    Ok(out)
}

/// Forward prediction in linear trait space at each temperature.
///
/// Uses the same effective coefficients as [`residuals`]; in the invalid
/// region there is no model value and the result is all `NaN`.
pub fn predict(
    model: ModelKind,
    params: &ParameterSet,
    temps: &[f64],
    constants: &ModelConstants,
) -> Result<Vec<f64>, TpcError> {
    let out = match Coefficients::read(model, params)?.evaluation() {
        Evaluation::Penalty => vec![f64::NAN; temps.len()],
        Evaluation::Valid(coeffs) => temps.iter().map(|&t| coeffs.log_rate(t, constants).exp()).collect(),
    };
    Ok(out)
}

/// The parameter values the model actually evaluates with (Full: Th/Tl
/// ordering clamp applied). Unchanged in the invalid region.
pub fn effective_params(model: ModelKind, params: &ParameterSet) -> Result<ParameterSet, TpcError> {
    match Coefficients::read(model, params)?.evaluation() {
        Evaluation::Penalty => Ok(params.clone()),
        Evaluation::Valid(coeffs) => Ok(coeffs.apply_to(params)),
    }
}
