//! Curve fitting.
//!
//! Responsibilities:
//!
//! - draw randomized starting values from sampling bounds (`sampler`)
//! - run one bounded Levenberg-Marquardt attempt and score it by AIC (`fitter`)
//! - resample N attempts and keep the minimum-AIC fit (`selection`)

pub mod fitter;
pub mod sampler;
pub mod selection;

pub use fitter::*;
pub use sampler::*;
pub use selection::*;
