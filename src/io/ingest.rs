//! CSV ingest and data preparation.
//!
//! Turns a long-format trait table (one observation per row) into validated
//! [`Curve`]s:
//! - **Configurable schema**: id / temperature / trait column names are
//!   resolved case-insensitively (clear errors + exit code 2)
//! - **Row-level validation**: bad rows are skipped and reported
//! - **Deterministic grouping**: curves keep first-seen order, points are
//!   sorted by temperature
//! - **Positive shift**: a column whose table-wide minimum is `<= 0` is moved
//!   up by `min - 1e-9`, the same amount for every curve
//!
//! No fitting logic here.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{BoundsSpec, Curve, PrepConfig};
use crate::error::AppError;

/// Added to Celsius temperatures.
pub const CELSIUS_TO_KELVIN: f64 = 273.15;

/// Seconds per day, for per-second to per-day rate conversion.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Gap left above zero when shifting a non-positive series.
pub const POSITIVE_OFFSET: f64 = 1e-9;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: prepared curves + row errors + counts.
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub curves: Vec<Curve>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

#[derive(Debug, Clone, Copy)]
struct Columns {
    id: usize,
    temp: usize,
    trait_value: usize,
}

/// Load a CSV file and prepare its curves.
pub fn load_curves(path: &Path, prep: &PrepConfig) -> Result<PreparedData, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_curves(file, prep)
}

/// Prepare curves from any CSV reader.
pub fn read_curves<R: Read>(input: R, prep: &PrepConfig) -> Result<PreparedData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = resolve_columns(&build_header_map(&headers), prep)?;

    // id -> (temps, traits), ids kept in first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, (Vec<f64>, Vec<f64>)> = HashMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;
    // Table-wide minima, taken before the curve filter so a filtered run
    // shifts exactly like a full one.
    let mut min_temp = f64::INFINITY;
    let mut min_trait = f64::INFINITY;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let (id, temp, value) = match parse_row(&record, columns, prep) {
            Ok(row) => row,
            Err(message) => {
                let id = get_field(&record, columns.id).map(str::to_string);
                row_errors.push(RowError { line, id, message });
                continue;
            }
        };

        min_temp = min_temp.min(temp);
        min_trait = min_trait.min(value);

        if !matches_filter(&id, &prep.curve_ids) {
            continue;
        }

        rows_used += 1;
        let group = groups.entry(id.clone()).or_insert_with(|| {
            order.push(id);
            (Vec::new(), Vec::new())
        });
        group.0.push(temp);
        group.1.push(value);
    }

    for wanted in &prep.curve_ids {
        if !groups.contains_key(wanted) {
            warn!(curve = %wanted, "requested curve id not present in input");
        }
    }

    let temp_shift = positive_shift(min_temp);
    let trait_shift = positive_shift(min_trait);
    if temp_shift.is_some() || trait_shift.is_some() {
        info!(min_temp, min_trait, "shifting non-positive columns above zero");
    }

    let mut curves = Vec::with_capacity(order.len());
    for id in order {
        let Some((mut temps, mut traits)) = groups.remove(&id) else {
            continue;
        };
        apply_shift(&mut temps, temp_shift);
        apply_shift(&mut traits, trait_shift);
        let curve = prepare_curve(id, temps, traits).map_err(|e| AppError::new(2, e.to_string()))?;
        curves.push(curve);
    }

    if curves.is_empty() {
        return Err(AppError::new(2, "No valid rows remain after parsing/filtering."));
    }

    info!(
        rows_read,
        rows_used,
        row_errors = row_errors.len(),
        curves = curves.len(),
        "ingest complete"
    );

    Ok(PreparedData {
        curves,
        row_errors,
        rows_read,
        rows_used,
    })
}

/// Sort one curve's points by temperature and validate.
fn prepare_curve(id: String, temps: Vec<f64>, traits: Vec<f64>) -> Result<Curve, crate::error::TpcError> {
    let mut points: Vec<(f64, f64)> = temps.into_iter().zip(traits).collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (temps, traits): (Vec<f64>, Vec<f64>) = points.into_iter().unzip();
    Curve::new(id, temps, traits)
}

/// Amount to subtract from a column whose minimum is `min`: `min - 1e-9`
/// when `min <= 0`, nothing otherwise.
pub fn positive_shift(min: f64) -> Option<f64> {
    (min.is_finite() && min <= 0.0).then(|| min - POSITIVE_OFFSET)
}

fn apply_shift(values: &mut [f64], shift: Option<f64>) {
    if let Some(shift) = shift {
        for v in values.iter_mut() {
            *v -= shift;
        }
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_columns(header_map: &HashMap<String, usize>, prep: &PrepConfig) -> Result<Columns, AppError> {
    let find = |name: &str, flag: &str| {
        header_map
            .get(&normalize_header_name(name))
            .copied()
            .ok_or_else(|| AppError::new(2, format!("Missing required column: `{name}` (set with `{flag}`)")))
    };
    Ok(Columns {
        id: find(&prep.id_col, "--id-col")?,
        temp: find(&prep.temp_col, "--temp-col")?,
        trait_value: find(&prep.trait_col, "--trait-col")?,
    })
}

fn parse_row(record: &StringRecord, columns: Columns, prep: &PrepConfig) -> Result<(String, f64, f64), String> {
    let id = get_field(record, columns.id).ok_or_else(|| "Missing curve id.".to_string())?;
    let temp = parse_f64(get_field(record, columns.temp), "temperature")?;
    let value = parse_f64(get_field(record, columns.trait_value), "trait")?;

    let temp = if prep.celsius { temp + CELSIUS_TO_KELVIN } else { temp };
    let value = if prep.per_second { value * SECONDS_PER_DAY } else { value };
    Ok((id.to_string(), temp, value))
}

fn get_field(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: Option<&str>, what: &str) -> Result<f64, String> {
    let s = s.ok_or_else(|| format!("Missing {what} value."))?;
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid {what} value '{s}'.")),
    }
}

fn matches_filter(id: &str, wanted: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| w == id)
}

/// Load sampling bounds from a JSON object such as `{"E": [0.05, 0.85]}`.
pub fn load_bounds_json(path: &Path) -> Result<BoundsSpec, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open bounds JSON '{}': {e}", path.display())))?;
    read_bounds_json(file)
}

pub fn read_bounds_json<R: Read>(input: R) -> Result<BoundsSpec, AppError> {
    serde_json::from_reader(input).map_err(|e| AppError::new(2, format!("Invalid bounds JSON: {e}")))
}
