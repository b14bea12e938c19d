//! Bounded-variable transforms.
//!
//! Levenberg-Marquardt works on an unconstrained vector. A parameter with a
//! domain `[min, max]` is optimized through an internal coordinate that maps
//! onto the domain for every real input:
//!
//! - both bounds: `x = min + (sin(u) + 1) * (max - min) / 2`
//! - lower only: `x = min - 1 + sqrt(u² + 1)`
//! - upper only: `x = max + 1 - sqrt(u² + 1)`
//! - none: `x = u`
//!
//! so every residual evaluation sees an in-domain value.

/// External (model-space) value → internal optimizer coordinate.
///
/// Values outside the domain are clipped first.
pub fn to_internal(value: f64, min: f64, max: f64) -> f64 {
    let v = value.clamp(min.min(max), max.max(min));
    match (min.is_finite(), max.is_finite()) {
        (true, true) => {
            if max == min {
                return 0.0;
            }
            (2.0 * (v - min) / (max - min) - 1.0).clamp(-1.0, 1.0).asin()
        }
        (true, false) => ((v - min + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
        (false, true) => ((max - v + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
        (false, false) => v,
    }
}

/// Internal optimizer coordinate → external value inside `[min, max]`.
pub fn from_internal(internal: f64, min: f64, max: f64) -> f64 {
    match (min.is_finite(), max.is_finite()) {
        (true, true) => min + (internal.sin() + 1.0) * (max - min) / 2.0,
        (true, false) => min - 1.0 + (internal * internal + 1.0).sqrt(),
        (false, true) => max + 1.0 - (internal * internal + 1.0).sqrt(),
        (false, false) => internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transforms_invert_inside_the_domain() {
        let cases = [
            (0.4, 0.01, f64::INFINITY),
            (300.0, 273.15, f64::INFINITY),
            (-2.5, f64::NEG_INFINITY, 1.0),
            (0.3, 0.0, 1.0),
            (-7.0, f64::NEG_INFINITY, f64::INFINITY),
        ];
        for (v, min, max) in cases {
            let back = from_internal(to_internal(v, min, max), min, max);
            assert!((back - v).abs() < 1e-9, "{v} -> {back} on [{min}, {max}]");
        }
    }

    #[test]
    fn any_internal_value_lands_in_domain() {
        for u in [-1e3, -3.0, -0.5, 0.0, 0.5, 3.0, 1e3] {
            let x = from_internal(u, 273.15, f64::INFINITY);
            assert!(x >= 273.15);
            let y = from_internal(u, 0.05, 0.85);
            assert!((0.05..=0.85).contains(&y));
        }
    }

    #[test]
    fn out_of_domain_values_are_clipped() {
        let u = to_internal(0.0, 0.01, f64::INFINITY);
        assert!((from_internal(u, 0.01, f64::INFINITY) - 0.01).abs() < 1e-12);
    }
}
