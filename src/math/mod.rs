//! Numerical utilities: truncated-normal sampling, bounded-variable transforms
//! and Jacobian rank.

pub mod bounds;
pub mod rank;
pub mod truncnorm;

pub use bounds::*;
pub use rank::*;
pub use truncnorm::*;
