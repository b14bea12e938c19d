//! Sharpe-Schoolfield model family.
//!
//! Models are implemented as small, pure functions over a [`crate::domain::ModelKind`]
//! tag so that fitting/search code can stay generic.

pub mod model;
pub mod templates;

pub use model::*;
pub use templates::*;
