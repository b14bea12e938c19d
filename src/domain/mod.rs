//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - parameter names, parameter sets and sampling bounds
//! - validated thermal performance curves (`Curve`)
//! - fit outputs (`FitResult`, `FittedModel`, `BestFit`, `CurveFile`)
//! - run configuration (`FitConfig`, `PrepConfig`)

pub mod types;

pub use types::*;
