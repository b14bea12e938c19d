//! Shared domain types.
//!
//! Parameter sets and sampling bounds are deliberately two separate value
//! types joined only by [`ParamName`]:
//!
//! - [`ParameterSet`] carries the optimizer's domain (`min`/`max`/`vary`)
//! - [`BoundsSpec`] carries the interval each restart samples its start value from
//!
//! Everything here is a plain value: restarts build new sets instead of
//! mutating a shared template.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{FitFailure, TpcError};

/// Sharpe-Schoolfield parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamName {
    /// Normalisation constant: rate at `Tref`.
    B0,
    /// Activation energy (eV).
    E,
    /// High-temperature deactivation energy (eV).
    Eh,
    /// Low-temperature deactivation energy (eV).
    El,
    /// High deactivation temperature (K).
    Th,
    /// Low deactivation temperature (K).
    Tl,
}

impl ParamName {
    pub const ALL: [ParamName; 6] = [
        ParamName::B0,
        ParamName::E,
        ParamName::Eh,
        ParamName::El,
        ParamName::Th,
        ParamName::Tl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamName::B0 => "B0",
            ParamName::E => "E",
            ParamName::Eh => "Eh",
            ParamName::El => "El",
            ParamName::Th => "Th",
            ParamName::Tl => "Tl",
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamName {
    type Err = TpcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TpcError::InvalidInput(format!("unknown parameter name '{s}'")))
    }
}

/// One optimizer parameter: current value plus the domain the optimizer may
/// move it in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub value: f64,
    pub min: f64,
    pub max: f64,
    /// Held fixed when `false`; fixed parameters do not count toward AIC.
    pub vary: bool,
}

impl Parameter {
    /// A free, unbounded parameter.
    pub fn free(value: f64) -> Self {
        Self {
            value,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            vary: true,
        }
    }

    /// A parameter held at `value` during optimization.
    pub fn fixed(value: f64) -> Self {
        Self {
            vary: false,
            ..Self::free(value)
        }
    }

    pub fn with_min(self, min: f64) -> Self {
        Self { min, ..self }
    }

    pub fn with_value(self, value: f64) -> Self {
        Self { value, ..self }
    }
}

/// Ordered mapping from parameter name to [`Parameter`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<(ParamName, Parameter)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a parameter, keeping first-insertion order.
    pub fn with(mut self, name: ParamName, param: Parameter) -> Self {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = param,
            None => self.entries.push((name, param)),
        }
        self
    }

    /// A copy of this set with one value replaced.
    pub fn with_value(&self, name: ParamName, value: f64) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|&(n, p)| if n == name { (n, p.with_value(value)) } else { (n, p) })
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: ParamName) -> Option<&Parameter> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    pub fn value(&self, name: ParamName) -> Option<f64> {
        self.get(name).map(|p| p.value)
    }

    pub fn names(&self) -> impl Iterator<Item = ParamName> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamName, &Parameter)> + '_ {
        self.entries.iter().map(|(n, p)| (*n, p))
    }

    /// Names of the parameters the optimizer is allowed to move, in set order.
    pub fn free_names(&self) -> Vec<ParamName> {
        self.entries.iter().filter(|(_, p)| p.vary).map(|(n, _)| *n).collect()
    }

    pub fn n_free(&self) -> usize {
        self.entries.iter().filter(|(_, p)| p.vary).count()
    }

    /// Name → value pairs in set order.
    pub fn values(&self) -> Vec<(ParamName, f64)> {
        self.entries.iter().map(|(n, p)| (*n, p.value)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sampling intervals for restart initialization: `{name: [low, high]}`.
///
/// Entries are kept as raw lists so that malformed input (wrong arity) can be
/// reported as [`TpcError::InvalidBounds`] at sampling time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundsSpec {
    entries: BTreeMap<ParamName, Vec<f64>>,
}

impl BoundsSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: ParamName, low: f64, high: f64) -> Self {
        self.with_raw(name, vec![low, high])
    }

    /// Insert an unchecked entry.
    pub fn with_raw(mut self, name: ParamName, values: Vec<f64>) -> Self {
        self.entries.insert(name, values);
        self
    }

    pub fn get(&self, name: ParamName) -> Option<&[f64]> {
        self.entries.get(&name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = ParamName> + '_ {
        self.entries.keys().copied()
    }

    /// Keep only the entries for `names`.
    pub fn restrict_to(&self, names: &[ParamName]) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(n, _)| names.contains(n))
            .map(|(n, v)| (*n, v.clone()))
            .collect();
        Self { entries }
    }

    /// Validated `(low, high)` interval for `name`.
    pub fn interval(&self, name: ParamName) -> Result<(f64, f64), TpcError> {
        let Some(values) = self.entries.get(&name) else {
            return Err(TpcError::InvalidBounds {
                name,
                reason: "no sampling interval given".into(),
            });
        };
        let &[low, high] = values.as_slice() else {
            return Err(TpcError::InvalidBounds {
                name,
                reason: format!("expected exactly 2 values [low, high], got {}", values.len()),
            });
        };
        if !(low.is_finite() && high.is_finite()) {
            return Err(TpcError::InvalidBounds {
                name,
                reason: format!("bounds must be finite, got [{low}, {high}]"),
            });
        }
        if low > high {
            return Err(TpcError::InvalidBounds {
                name,
                reason: format!("low ({low}) is greater than high ({high})"),
            });
        }
        Ok((low, high))
    }

    /// Fail with [`TpcError::BoundsMismatch`] unless the key set equals the
    /// template's.
    pub fn ensure_matches(&self, template: &ParameterSet) -> Result<(), TpcError> {
        let params: HashSet<ParamName> = template.names().collect();
        let bounds: HashSet<ParamName> = self.names().collect();
        if params == bounds {
            return Ok(());
        }
        let mut params: Vec<ParamName> = params.into_iter().collect();
        let mut bounds: Vec<ParamName> = bounds.into_iter().collect();
        params.sort();
        bounds.sort();
        Err(TpcError::BoundsMismatch { params, bounds })
    }
}

/// One thermal performance curve: paired Kelvin temperatures and trait values.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    id: String,
    temps: Vec<f64>,
    traits: Vec<f64>,
}

impl Curve {
    /// Validate and build a curve. Both arrays must be non-empty, of equal
    /// length, finite and strictly positive.
    pub fn new(id: impl Into<String>, temps: Vec<f64>, traits: Vec<f64>) -> Result<Self, TpcError> {
        let id = id.into();
        if temps.is_empty() {
            return Err(TpcError::InvalidInput(format!("curve '{id}': no temperature values supplied")));
        }
        if traits.is_empty() {
            return Err(TpcError::InvalidInput(format!("curve '{id}': no trait values supplied")));
        }
        if temps.len() != traits.len() {
            return Err(TpcError::InvalidInput(format!(
                "curve '{id}': {} temperatures but {} trait values",
                temps.len(),
                traits.len()
            )));
        }
        check_positive(&id, "temperature", &temps)?;
        check_positive(&id, "trait", &traits)?;
        Ok(Self { id, temps, traits })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Temperatures in Kelvin.
    pub fn temps(&self) -> &[f64] {
        &self.temps
    }

    pub fn traits(&self) -> &[f64] {
        &self.traits
    }

    pub fn len(&self) -> usize {
        self.temps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temps.is_empty()
    }

    /// Natural log of each trait value (a fresh working copy).
    pub fn log_traits(&self) -> Vec<f64> {
        self.traits.iter().map(|v| v.ln()).collect()
    }

    /// Number of distinct temperatures.
    pub fn unique_temps(&self) -> usize {
        let mut bits: Vec<u64> = self.temps.iter().map(|t| t.to_bits()).collect();
        bits.sort_unstable();
        bits.dedup();
        bits.len()
    }
}

fn check_positive(id: &str, what: &str, values: &[f64]) -> Result<(), TpcError> {
    match values.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
        Some(i) => Err(TpcError::InvalidInput(format!(
            "curve '{id}': {what} value {} at index {i} is not a finite positive number",
            values[i]
        ))),
        None => Ok(()),
    }
}

/// Sharpe-Schoolfield variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Low- and high-temperature deactivation.
    Full,
    /// High-temperature deactivation only.
    High,
    /// Low-temperature deactivation only.
    Low,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Full, ModelKind::High, ModelKind::Low];

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Full => "Sharpe-Schoolfield (full)",
            ModelKind::High => "Sharpe-Schoolfield (high)",
            ModelKind::Low => "Sharpe-Schoolfield (low)",
        }
    }

    /// Stable identifier used in exports.
    pub fn model_name(self) -> &'static str {
        match self {
            ModelKind::Full => "sharpeschoolfull",
            ModelKind::High => "sharpeschoolhigh",
            ModelKind::Low => "sharpeschoollow",
        }
    }

    /// Parameters the variant's residual function reads.
    pub fn param_names(self) -> &'static [ParamName] {
        match self {
            ModelKind::Full => &[
                ParamName::B0,
                ParamName::E,
                ParamName::Eh,
                ParamName::El,
                ParamName::Th,
                ParamName::Tl,
            ],
            ModelKind::High => &[ParamName::B0, ParamName::E, ParamName::Eh, ParamName::Th],
            ModelKind::Low => &[ParamName::B0, ParamName::E, ParamName::El, ParamName::Tl],
        }
    }

    pub fn param_count(self) -> usize {
        self.param_names().len()
    }
}

/// A converged optimizer attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    /// Final estimates (effective values the model was evaluated with).
    pub params: ParameterSet,
    /// Predicted trait values aligned with the curve's temperatures.
    pub fitted: Vec<f64>,
    /// Residual sum of squares at the solution.
    pub chisqr: f64,
    pub aic: f64,
    /// Number of residual evaluations the optimizer used.
    pub n_evals: usize,
}

/// Product of one optimization attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub attempt: usize,
    pub model: ModelKind,
    /// Starting values the optimizer was given.
    pub initial: ParameterSet,
    pub outcome: Result<FittedModel, FitFailure>,
}

impl FitResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn aic(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|f| f.aic)
    }
}

/// Minimum-AIC attempt of one resampling run.
#[derive(Debug, Clone, PartialEq)]
pub struct BestFit {
    pub curve_id: String,
    pub model: ModelKind,
    /// Index of the winning attempt.
    pub attempt: usize,
    pub attempts: usize,
    pub successes: usize,
    pub initial: ParameterSet,
    pub fit: FittedModel,
}

impl BestFit {
    pub fn aic(&self) -> f64 {
        self.fit.aic
    }

    /// Final parameter estimates as `(name, value)` pairs.
    pub fn estimates(&self) -> Vec<(ParamName, f64)> {
        self.fit.params.values()
    }

    pub fn initial_values(&self) -> Vec<(ParamName, f64)> {
        self.initial.values()
    }

    pub fn fitted(&self) -> &[f64] {
        &self.fit.fitted
    }
}

/// Per-curve result of a multi-curve run.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveOutcome {
    pub curve: Curve,
    pub result: Result<BestFit, TpcError>,
}

impl CurveOutcome {
    pub fn best(&self) -> Option<&BestFit> {
        self.result.as_ref().ok()
    }

    /// `"ok"` or the error message.
    pub fn status(&self) -> String {
        match &self.result {
            Ok(_) => "ok".to_string(),
            Err(e) => e.to_string(),
        }
    }
}

/// Input column layout and unit handling for CSV ingest.
#[derive(Debug, Clone)]
pub struct PrepConfig {
    pub id_col: String,
    pub temp_col: String,
    pub trait_col: String,
    /// Temperatures are in Celsius and get +273.15.
    pub celsius: bool,
    /// Traits are per-second rates and get ×86400.
    pub per_second: bool,
    /// Only keep these curve ids (empty = all).
    pub curve_ids: Vec<String>,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            id_col: "originalid".to_string(),
            temp_col: "interactor1temp".to_string(),
            trait_col: "standardisedtraitvalue".to_string(),
            celsius: false,
            per_second: false,
            curve_ids: Vec::new(),
        }
    }
}

/// A full `tpcfit fit` run's configuration, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub csv_path: PathBuf,
    pub prep: PrepConfig,
    pub model: ModelKind,
    pub bounds_path: Option<PathBuf>,
    pub attempts: usize,
    pub seed: Option<u64>,
    pub tref: f64,
    pub parallel: bool,
    pub export_results: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

/// Fitted curve as written to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub curve_id: String,
    pub model: ModelKind,
    pub model_name: String,
    pub tref: f64,
    pub aic: f64,
    pub attempts: usize,
    pub successes: usize,
    pub estimates: BTreeMap<ParamName, f64>,
    pub initial: BTreeMap<ParamName, f64>,
    pub temps: Vec<f64>,
    pub traits: Vec<f64>,
    pub fitted: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_rejects_non_positive_values() {
        let err = Curve::new("c", vec![280.0, 0.0], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, TpcError::InvalidInput(_)));

        let err = Curve::new("c", vec![280.0, 290.0], vec![1.0, -0.5]).unwrap_err();
        assert!(matches!(err, TpcError::InvalidInput(_)));

        let err = Curve::new("c", vec![280.0, f64::NAN], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, TpcError::InvalidInput(_)));
    }

    #[test]
    fn curve_rejects_missing_or_mismatched_arrays() {
        assert!(matches!(
            Curve::new("c", vec![], vec![1.0]),
            Err(TpcError::InvalidInput(_))
        ));
        assert!(matches!(
            Curve::new("c", vec![280.0], vec![]),
            Err(TpcError::InvalidInput(_))
        ));
        assert!(matches!(
            Curve::new("c", vec![280.0, 290.0], vec![1.0]),
            Err(TpcError::InvalidInput(_))
        ));
    }

    #[test]
    fn log_traits_is_a_copy() {
        let curve = Curve::new("c", vec![280.0, 290.0], vec![1.0, std::f64::consts::E]).unwrap();
        let logged = curve.log_traits();
        assert!(logged[0].abs() < 1e-12);
        assert!((logged[1] - 1.0).abs() < 1e-12);
        assert_eq!(curve.traits(), &[1.0, std::f64::consts::E]);
    }

    #[test]
    fn unique_temps_counts_distinct_values() {
        let curve = Curve::new("c", vec![280.0, 280.0, 290.0], vec![1.0, 1.1, 2.0]).unwrap();
        assert_eq!(curve.unique_temps(), 2);
    }

    #[test]
    fn parameter_set_with_value_leaves_original_untouched() {
        let set = ParameterSet::new()
            .with(ParamName::B0, Parameter::free(1.0))
            .with(ParamName::E, Parameter::free(0.5).with_min(0.01));
        let next = set.with_value(ParamName::E, 0.7);
        assert_eq!(set.value(ParamName::E), Some(0.5));
        assert_eq!(next.value(ParamName::E), Some(0.7));
        assert_eq!(next.get(ParamName::E).map(|p| p.min), Some(0.01));
        assert_eq!(next.names().collect::<Vec<_>>(), vec![ParamName::B0, ParamName::E]);
    }

    #[test]
    fn free_names_skip_fixed_parameters() {
        let set = ParameterSet::new()
            .with(ParamName::B0, Parameter::free(1.0))
            .with(ParamName::E, Parameter::fixed(0.6));
        assert_eq!(set.free_names(), vec![ParamName::B0]);
        assert_eq!(set.n_free(), 1);
    }

    #[test]
    fn bounds_interval_validates_arity_and_order() {
        let bounds = BoundsSpec::new()
            .with(ParamName::E, 0.05, 0.85)
            .with_raw(ParamName::Eh, vec![0.5, 0.9, 1.2])
            .with(ParamName::Th, 330.0, 273.15);

        assert_eq!(bounds.interval(ParamName::E), Ok((0.05, 0.85)));
        assert!(matches!(
            bounds.interval(ParamName::Eh),
            Err(TpcError::InvalidBounds { name: ParamName::Eh, .. })
        ));
        assert!(matches!(
            bounds.interval(ParamName::Th),
            Err(TpcError::InvalidBounds { name: ParamName::Th, .. })
        ));
    }

    #[test]
    fn bounds_json_uses_parameter_names_as_keys() {
        let bounds: BoundsSpec = serde_json::from_str(r#"{"B0": [0.05, 1.2], "Tl": [273.15, 330]}"#).unwrap();
        assert_eq!(bounds.interval(ParamName::B0), Ok((0.05, 1.2)));
        assert_eq!(bounds.interval(ParamName::Tl), Ok((273.15, 330.0)));
    }

    #[test]
    fn param_name_round_trips_through_str() {
        for name in ParamName::ALL {
            assert_eq!(name.as_str().parse::<ParamName>(), Ok(name));
        }
        assert!("Q10".parse::<ParamName>().is_err());
    }
}
