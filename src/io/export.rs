//! CSV exports.
//!
//! - per-curve fit results (`write_results_csv`)
//! - cleaned long-format data (`write_clean_csv`)
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{Curve, CurveOutcome, ModelKind};
use crate::error::{AppError, TpcError};

/// Write one row per curve to `path`.
pub fn write_results_csv(path: &Path, model: ModelKind, outcomes: &[CurveOutcome]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(file, model, outcomes)
}

pub fn write_results<W: Write>(out: W, model: ModelKind, outcomes: &[CurveOutcome]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = vec![
        "curve_id",
        "model",
        "status",
        "n_points",
        "unique_temps",
        "attempts",
        "successes",
        "aic",
    ];
    header.extend(model.param_names().iter().map(|p| p.as_str()));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for o in outcomes {
        let mut row = vec![
            o.curve.id().to_string(),
            model.model_name().to_string(),
            o.status(),
            o.curve.len().to_string(),
            o.curve.unique_temps().to_string(),
        ];
        match &o.result {
            Ok(best) => {
                row.push(best.attempts.to_string());
                row.push(best.successes.to_string());
                row.push(format!("{:.6}", best.aic()));
                for name in model.param_names() {
                    row.push(
                        best.fit
                            .params
                            .value(*name)
                            .map(|v| format!("{v:.10}"))
                            .unwrap_or_default(),
                    );
                }
            }
            Err(err) => {
                let attempts = match err {
                    TpcError::NoConvergence { attempts, .. } => attempts.to_string(),
                    _ => String::new(),
                };
                row.push(attempts);
                row.push("0".to_string());
                row.push(String::new());
                row.extend(model.param_names().iter().map(|_| String::new()));
            }
        }
        writer
            .write_record(&row)
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Write prepared curves as `curve_id,temps,traits,unique_temps`, one row per
/// observation.
pub fn write_clean_csv(path: &Path, curves: &[Curve]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create clean CSV '{}': {e}", path.display())))?;
    write_clean(file, curves)
}

pub fn write_clean<W: Write>(out: W, curves: &[Curve]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["curve_id", "temps", "traits", "unique_temps"])
        .map_err(|e| AppError::new(2, format!("Failed to write clean CSV header: {e}")))?;

    for curve in curves {
        let unique = curve.unique_temps().to_string();
        for (t, y) in curve.temps().iter().zip(curve.traits()) {
            writer
                .write_record([curve.id(), &t.to_string(), &y.to_string(), &unique])
                .map_err(|e| AppError::new(2, format!("Failed to write clean CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush clean CSV: {e}")))
}
