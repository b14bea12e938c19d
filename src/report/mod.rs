//! Reporting utilities: per-point residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{BestFit, Curve};

/// Observed vs fitted at one temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    pub temp: f64,
    pub observed: f64,
    pub fitted: f64,
    /// `fitted - ln(observed)`, the quantity the optimizer minimized.
    pub residual: f64,
}

/// Pair each observation of `curve` with the best fit's prediction.
pub fn compute_residuals(curve: &Curve, best: &BestFit) -> Vec<PointResidual> {
    curve
        .temps()
        .iter()
        .zip(curve.traits())
        .zip(best.fitted())
        .map(|((&temp, &observed), &fitted)| PointResidual {
            temp,
            observed,
            fitted,
            residual: fitted - observed.ln(),
        })
        .collect()
}

/// Root-mean-square of the residuals, `None` for an empty slice.
pub fn rms(residuals: &[PointResidual]) -> Option<f64> {
    if residuals.is_empty() {
        return None;
    }
    let ss: f64 = residuals.iter().map(|r| r.residual * r.residual).sum();
    Some((ss / residuals.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FittedModel, ModelKind};
    use crate::models::default_parameters;

    #[test]
    fn residuals_match_chisqr() {
        let curve = Curve::new("c", vec![290.0, 300.0], vec![1.0, std::f64::consts::E]).unwrap();
        let params = default_parameters(ModelKind::Low);
        let best = BestFit {
            curve_id: "c".into(),
            model: ModelKind::Low,
            attempt: 0,
            attempts: 1,
            successes: 1,
            initial: params.clone(),
            fit: FittedModel {
                params,
                fitted: vec![0.5, 1.0],
                chisqr: 0.25,
                aic: 0.0,
                n_evals: 1,
            },
        };

        let r = compute_residuals(&curve, &best);
        assert_eq!(r.len(), 2);
        assert!((r[0].residual - 0.5).abs() < 1e-12);
        assert!(r[1].residual.abs() < 1e-12);
        let ss: f64 = r.iter().map(|p| p.residual.powi(2)).sum();
        assert!((ss - best.fit.chisqr).abs() < 1e-12);
        assert!((rms(&r).unwrap() - (0.125f64).sqrt()).abs() < 1e-12);
        assert!(rms(&[]).is_none());
    }
}
