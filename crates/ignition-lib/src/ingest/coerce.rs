//! Cell coercion for untyped CSV text
//!
//! Every coercion returns `None` on failure; callers decide whether an
//! absent value drops the row or is stored as null.

use chrono::{NaiveDate, NaiveDateTime};

const NULL_MARKERS: &[&str] = &["nan", "null", "none", "nat", "n/a"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// Trimmed cell text, or `None` for empty and null-marker cells
pub fn text(cell: Option<&str>) -> Option<&str> {
    let trimmed = cell?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if NULL_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
        return None;
    }
    Some(trimmed)
}

pub fn float(cell: Option<&str>) -> Option<f64> {
    let raw = text(cell)?;
    let value = match raw.parse::<f64>() {
        Ok(v) => v,
        Err(_) => raw.replace(',', ".").parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

/// Integer cell; integral floats such as `"4.0"` are accepted
pub fn int(cell: Option<&str>) -> Option<i64> {
    let raw = text(cell)?;
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    let v = float(Some(raw))?;
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

/// Datetime cell; date-only values resolve to midnight
pub fn datetime(cell: Option<&str>) -> Option<NaiveDateTime> {
    let raw = text(cell)?;
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Parse a boundary date: `YYYY-MM-DD`, or a full ISO datetime truncated to its date
pub fn boundary_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
}
