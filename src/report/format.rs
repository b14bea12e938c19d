//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::domain::{CurveOutcome, FitConfig, ParamName};
use crate::io::ingest::PreparedData;
use crate::report::{PointResidual, compute_residuals, rms};

/// Format the full run summary (dataset stats + one line per curve).
pub fn format_run_summary(data: &PreparedData, outcomes: &[CurveOutcome], config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== tpcfit - Thermal Performance Curve Fit ===\n");
    out.push_str(&format!(
        "Model: {} ({})\n",
        config.model.display_name(),
        config.model.model_name()
    ));
    out.push_str(&format!(
        "Attempts/curve: {} | Tref: {:.2} K | seed: {}\n",
        config.attempts,
        config.tref,
        config.seed.map(|s| s.to_string()).unwrap_or_else(|| "random".to_string()),
    ));
    out.push_str(&format!(
        "Rows: read={} used={} errors={} | curves={}\n",
        data.rows_read,
        data.rows_used,
        data.row_errors.len(),
        data.curves.len()
    ));

    let fitted = outcomes.iter().filter(|o| o.best().is_some()).count();
    out.push_str(&format!("Fitted: {fitted}/{}\n\n", outcomes.len()));

    out.push_str(&format_outcome_table(outcomes));
    out
}

fn format_outcome_table(outcomes: &[CurveOutcome]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<20} {:>4} {:>5} {:>7} {:>12} {}\n",
            "curve", "n", "temps", "ok/att", "aic", "estimates"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<20} {:-<4} {:-<5} {:-<7} {:-<12} {:-<24}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for o in outcomes {
        let id = truncate(o.curve.id(), 20);
        let line = match &o.result {
            Ok(best) => format!(
                "{:<20} {:>4} {:>5} {:>7} {:>12.4} {}",
                id,
                o.curve.len(),
                o.curve.unique_temps(),
                format!("{}/{}", best.successes, best.attempts),
                best.aic(),
                fmt_estimates(&best.estimates()),
            ),
            Err(e) => format!(
                "{:<20} {:>4} {:>5} {:>7} {:>12} FAILED: {e}",
                id,
                o.curve.len(),
                o.curve.unique_temps(),
                "-",
                "-",
            ),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Point-by-point table for one fitted curve (empty for failures).
pub fn format_curve_detail(outcome: &CurveOutcome) -> String {
    let Some(best) = outcome.best() else {
        return String::new();
    };
    let residuals = compute_residuals(&outcome.curve, best);

    let mut out = String::new();
    out.push_str(&format!(
        "Curve {} (attempt {} of {}, chisqr={:.6}, rms={:.6}):\n",
        outcome.curve.id(),
        best.attempt,
        best.attempts,
        best.fit.chisqr,
        rms(&residuals).unwrap_or(f64::NAN),
    ));
    out.push_str(&format!("  start: {}\n", fmt_estimates(&best.initial_values())));
    out.push_str(&format_point_table(&residuals));
    out
}

fn format_point_table(rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>10} {:>14} {:>14} {:>14} {:>12}\n",
            "temp_K", "trait", "ln(trait)", "fitted", "residual"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<14} {:-<14} {:-<14} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');
    for r in rows {
        out.push_str(
            format!(
                "{:>10.2} {:>14.6} {:>14.6} {:>14.6} {:>12.6}\n",
                r.temp,
                r.observed,
                r.observed.ln(),
                r.fitted,
                r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Summary for `tpcfit clean`.
pub fn format_clean_summary(data: &PreparedData) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Rows: read={} used={} errors={} | curves={}\n",
        data.rows_read,
        data.rows_used,
        data.row_errors.len(),
        data.curves.len()
    ));
    for e in data.row_errors.iter().take(10) {
        out.push_str(&format!(
            "  line {}{}: {}\n",
            e.line,
            e.id.as_deref().map(|id| format!(" ({id})")).unwrap_or_default(),
            e.message
        ));
    }
    if data.row_errors.len() > 10 {
        out.push_str(&format!("  ... {} more\n", data.row_errors.len() - 10));
    }
    out
}

fn fmt_estimates(values: &[(ParamName, f64)]) -> String {
    let parts: Vec<String> = values.iter().map(|(n, v)| format!("{n}={v:.4}")).collect();
    parts.join(" ")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BestFit, Curve, FittedModel, ModelKind};
    use crate::error::TpcError;
    use crate::io::ingest::RowError;
    use crate::models::default_parameters;

    fn outcomes() -> Vec<CurveOutcome> {
        let ok = Curve::new("good", vec![290.0, 300.0, 310.0], vec![1.0, 2.0, 1.5]).unwrap();
        let bad = Curve::new("flat", vec![300.0, 300.0], vec![1.0, 1.0]).unwrap();
        let params = default_parameters(ModelKind::Low).with_value(ParamName::E, 0.65);
        let best = BestFit {
            curve_id: "good".into(),
            model: ModelKind::Low,
            attempt: 1,
            attempts: 5,
            successes: 3,
            initial: params.clone(),
            fit: FittedModel {
                params,
                fitted: vec![0.1, 0.6, 0.4],
                chisqr: 0.01,
                aic: -10.0,
                n_evals: 30,
            },
        };
        vec![
            CurveOutcome {
                curve: ok,
                result: Ok(best),
            },
            CurveOutcome {
                curve: bad,
                result: Err(TpcError::NoConvergence {
                    curve_id: "flat".into(),
                    attempts: 5,
                }),
            },
        ]
    }

    fn prepared(outcomes: &[CurveOutcome]) -> PreparedData {
        PreparedData {
            curves: outcomes.iter().map(|o| o.curve.clone()).collect(),
            row_errors: vec![RowError {
                line: 4,
                id: Some("x".into()),
                message: "Missing trait value.".into(),
            }],
            rows_read: 6,
            rows_used: 5,
        }
    }

    #[test]
    fn truncate_adds_marker() {
        assert_eq!(truncate("abcdef", 4), "abc.");
        assert_eq!(truncate("abc", 4), "abc");
    }

    #[test]
    fn run_summary_lists_each_curve() {
        let outcomes = outcomes();
        let config = FitConfig {
            csv_path: "data.csv".into(),
            prep: Default::default(),
            model: ModelKind::Low,
            bounds_path: None,
            attempts: 5,
            seed: Some(42),
            tref: 283.15,
            parallel: true,
            export_results: None,
            export_curve: None,
        };
        let text = format_run_summary(&prepared(&outcomes), &outcomes, &config);
        assert!(text.contains("sharpeschoollow"));
        assert!(text.contains("seed: 42"));
        assert!(text.contains("Fitted: 1/2"));
        assert!(text.contains("3/5"));
        assert!(text.contains("E=0.6500"));
        assert!(text.contains("FAILED: curve 'flat'"));
    }

    #[test]
    fn curve_detail_only_for_fits() {
        let outcomes = outcomes();
        let detail = format_curve_detail(&outcomes[0]);
        assert!(detail.starts_with("Curve good (attempt 1 of 5"));
        assert_eq!(detail.lines().count(), 2 + 2 + 3);
        assert!(format_curve_detail(&outcomes[1]).is_empty());
    }

    #[test]
    fn clean_summary_shows_row_errors() {
        let text = format_clean_summary(&prepared(&outcomes()));
        assert!(text.contains("read=6 used=5 errors=1"));
        assert!(text.contains("line 4 (x): Missing trait value."));
    }
}
