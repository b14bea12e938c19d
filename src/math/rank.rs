//! Numerical rank of a Jacobian.
//!
//! Used after a fit converges to reject solutions whose local linearization
//! cannot identify the parameters (e.g. every observation at one temperature).
//! Like the rest of the crate's linear algebra this goes through nalgebra's SVD,
//! which handles tall and wide matrices alike.

use nalgebra::DMatrix;

/// Relative singular-value cutoff.
const RANK_RTOL: f64 = 1e-10;

/// Count singular values above `RANK_RTOL * σ_max`.
///
/// Returns `None` if the matrix contains non-finite entries.
pub fn numerical_rank(m: &DMatrix<f64>) -> Option<usize> {
    if m.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if m.nrows() == 0 || m.ncols() == 0 {
        return Some(0);
    }
    let singular = m.clone().svd(false, false).singular_values;
    let s_max = singular.iter().copied().fold(0.0_f64, f64::max);
    if s_max == 0.0 {
        return Some(0);
    }
    let cutoff = RANK_RTOL * s_max;
    Some(singular.iter().filter(|&&s| s > cutoff).count())
}
