//! Default parameter templates and sampling bounds per variant.
//!
//! Templates carry the optimizer's domain: `B0` is kept non-negative (the
//! log-rate is undefined below zero), energies stay above 0.01 eV and
//! deactivation temperatures above freezing. The values are placeholders;
//! every restart replaces them with sampled ones.

use crate::domain::{BoundsSpec, ModelKind, ParamName, Parameter, ParameterSet};

/// Lower domain bound for activation / deactivation energies (eV).
pub const MIN_ENERGY: f64 = 0.01;

/// Lower domain bound for deactivation temperatures (K).
pub const MIN_DEACTIVATION_TEMP: f64 = 273.15;

fn template_param(name: ParamName) -> Parameter {
    match name {
        ParamName::B0 => Parameter::free(1.0).with_min(0.0),
        ParamName::E | ParamName::Eh | ParamName::El => Parameter::free(MIN_ENERGY).with_min(MIN_ENERGY),
        ParamName::Th | ParamName::Tl => Parameter::free(MIN_DEACTIVATION_TEMP).with_min(MIN_DEACTIVATION_TEMP),
    }
}

/// Optimizer template for `model`: all of its parameters, free, with domain bounds.
pub fn default_parameters(model: ModelKind) -> ParameterSet {
    model
        .param_names()
        .iter()
        .fold(ParameterSet::new(), |set, &name| set.with(name, template_param(name)))
}

/// Canonical restart sampling intervals, covering all six parameters.
pub fn canonical_bounds() -> BoundsSpec {
    BoundsSpec::new()
        .with(ParamName::B0, 0.05, 1.2)
        .with(ParamName::E, 0.05, 0.85)
        .with(ParamName::Eh, 0.5, 1.2)
        .with(ParamName::El, 0.05, 0.7)
        .with(ParamName::Th, 273.15, 330.0)
        .with(ParamName::Tl, 273.15, 330.0)
}

/// Canonical sampling intervals restricted to `model`'s parameters.
pub fn default_bounds(model: ModelKind) -> BoundsSpec {
    canonical_bounds().restrict_to(model.param_names())
}
