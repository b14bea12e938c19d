//! Input/output helpers.
//!
//! - CSV ingest + data preparation, bounds JSON (`ingest`)
//! - results and cleaned-data CSV exports (`export`)
//! - fitted-curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
