//! Randomized starting values for restarts.
//!
//! Each parameter's start value is drawn from a normal distribution truncated
//! to its sampling interval `[low, high]`, with mean at the midpoint and
//! `sd = (high - low) / 2`. The template's domain bounds and `vary` flags are
//! carried over untouched; the template itself is never modified.

use rand::Rng;
use rand_distr::Distribution;

use crate::domain::{BoundsSpec, ParameterSet};
use crate::error::TpcError;
use crate::math::TruncatedNormal;

/// Draw a fresh parameter set from `bounds`.
///
/// Errors:
/// - [`TpcError::BoundsMismatch`] if the key sets differ
/// - [`TpcError::InvalidBounds`] if an entry is not exactly `[low, high]` with `low <= high`
pub fn sample_start_params<R: Rng + ?Sized>(
    template: &ParameterSet,
    bounds: &BoundsSpec,
    rng: &mut R,
) -> Result<ParameterSet, TpcError> {
    bounds.ensure_matches(template)?;

    // Validate everything before drawing so a bad entry never leaves a
    // half-consumed RNG stream behind.
    let mut dists = Vec::with_capacity(template.len());
    for name in template.names() {
        let (low, high) = bounds.interval(name)?;
        let dist = TruncatedNormal::from_interval(low, high).ok_or_else(|| TpcError::InvalidBounds {
            name,
            reason: format!("cannot build a sampling distribution on [{low}, {high}]"),
        })?;
        dists.push((name, dist));
    }

    Ok(dists
        .into_iter()
        .fold(template.clone(), |set, (name, dist)| set.with_value(name, dist.sample(&mut *rng))))
}

/// Check a template/bounds pair without drawing anything.
pub fn validate_bounds(template: &ParameterSet, bounds: &BoundsSpec) -> Result<(), TpcError> {
    bounds.ensure_matches(template)?;
    for name in template.names() {
        bounds.interval(name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelKind, ParamName};
    use crate::models::{default_bounds, default_parameters};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn sampled_values_fall_inside_bounds() {
        let template = default_parameters(ModelKind::Full);
        let bounds = default_bounds(ModelKind::Full);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let params = sample_start_params(&template, &bounds, &mut rng).unwrap();
            for (name, p) in params.iter() {
                let (low, high) = bounds.interval(name).unwrap();
                assert!(p.value >= low && p.value <= high, "{name}={} outside [{low}, {high}]", p.value);
            }
        }
    }

    #[test]
    fn template_is_not_mutated_and_domains_survive() {
        let template = default_parameters(ModelKind::High);
        let before = template.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let params = sample_start_params(&template, &default_bounds(ModelKind::High), &mut rng).unwrap();
        assert_eq!(template, before);
        for (name, p) in params.iter() {
            let t = template.get(name).unwrap();
            assert_eq!((p.min, p.max, p.vary), (t.min, t.max, t.vary));
        }
    }

    #[test]
    fn sample_mean_tracks_interval_midpoint() {
        let template = default_parameters(ModelKind::Low);
        let bounds = default_bounds(ModelKind::Low);
        let mut rng = StdRng::seed_from_u64(2024);
        let n = 5_000;
        let mut sum = 0.0;
        for _ in 0..n {
            sum += sample_start_params(&template, &bounds, &mut rng)
                .unwrap()
                .value(ParamName::Tl)
                .unwrap();
        }
        let mean = sum / n as f64;
        assert!((mean - 301.575).abs() < 1.0, "mean {mean}");
    }

    #[test]
    fn same_seed_same_draws() {
        let template = default_parameters(ModelKind::Full);
        let bounds = default_bounds(ModelKind::Full);
        let a = sample_start_params(&template, &bounds, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = sample_start_params(&template, &bounds, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn mismatched_keys_fail() {
        let template = default_parameters(ModelKind::Full);
        let mut rng = StdRng::seed_from_u64(0);

        let missing = default_bounds(ModelKind::High);
        assert!(matches!(
            sample_start_params(&template, &missing, &mut rng),
            Err(TpcError::BoundsMismatch { .. })
        ));

        let extra = default_bounds(ModelKind::Full);
        let small = default_parameters(ModelKind::Low);
        assert!(matches!(
            sample_start_params(&small, &extra, &mut rng),
            Err(TpcError::BoundsMismatch { .. })
        ));
    }

    #[test]
    fn wrong_arity_and_inverted_bounds_fail() {
        let template = default_parameters(ModelKind::Low);
        let mut rng = StdRng::seed_from_u64(0);

        for raw in [vec![0.1], vec![0.1, 0.2, 0.3], vec![]] {
            let bounds = default_bounds(ModelKind::Low).with_raw(ParamName::El, raw);
            assert!(matches!(
                sample_start_params(&template, &bounds, &mut rng),
                Err(TpcError::InvalidBounds { name: ParamName::El, .. })
            ));
        }

        let inverted = default_bounds(ModelKind::Low).with(ParamName::E, 0.85, 0.05);
        assert!(matches!(
            sample_start_params(&template, &inverted, &mut rng),
            Err(TpcError::InvalidBounds { name: ParamName::E, .. })
        ));
        assert!(validate_bounds(&template, &inverted).is_err());
    }
}
