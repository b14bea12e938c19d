//! Fitted-curve JSON export.
//!
//! Curve JSON is the portable representation of a fit:
//! - model variant + estimates and the starting values that produced them
//! - fit metadata (AIC, attempts, Tref, generation time)
//! - observed temperatures/traits next to the fitted values
//!
//! A file holds an array of `domain::CurveFile`, one per fitted curve.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{BestFit, Curve, CurveFile};
use crate::error::AppError;

/// Build the JSON record for one fitted curve.
pub fn curve_file(best: &BestFit, curve: &Curve, tref: f64) -> CurveFile {
    CurveFile {
        tool: "tpcfit".to_string(),
        generated_at: Utc::now(),
        curve_id: best.curve_id.clone(),
        model: best.model,
        model_name: best.model.model_name().to_string(),
        tref,
        aic: best.aic(),
        attempts: best.attempts,
        successes: best.successes,
        estimates: best.estimates().into_iter().collect(),
        initial: best.initial_values().into_iter().collect(),
        temps: curve.temps().to_vec(),
        traits: curve.traits().to_vec(),
        fitted: best.fitted().to_vec(),
    }
}

/// Write curve JSON records.
pub fn write_curve_json(path: &Path, curves: &[CurveFile]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, curves).map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))
}
