use chrono::{DateTime, Utc};
use numfmt::{Formatter, Precision, Scales};
use serde::{Deserialize, Serialize};

/// Unit tags reported in `metadata.units_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitType {
    Apdex,
    Bits,
    BitsPerMs,
    BitsPerS,
    Bytes,
    BytesPerMs,
    BytesPerS,
    Count,
    Hertz,
    Ms,
    PagesPerSecond,
    Percentage,
    RequestsPerSecond,
    Seconds,
    Timestamp,
    #[default]
    #[serde(other)]
    Unknown,
}

impl UnitType {
    /// Display suffix appended to formatted values.
    pub fn suffix(self) -> &'static str {
        match self {
            UnitType::Apdex => "",
            UnitType::Bits => "b",
            UnitType::BitsPerMs => "b/ms",
            UnitType::BitsPerS => "b/s",
            UnitType::Bytes => "B",
            UnitType::BytesPerMs => "B/ms",
            UnitType::BytesPerS => "B/s",
            UnitType::Count => "",
            UnitType::Hertz => "Hz",
            UnitType::Ms => "ms",
            UnitType::PagesPerSecond => "page/s",
            UnitType::Percentage => "%",
            UnitType::RequestsPerSecond => "req/s",
            UnitType::Seconds => "s",
            UnitType::Timestamp => "",
            UnitType::Unknown => "",
        }
    }
}

const TIMESTAMP_PATTERN: &str = "%b %-d, %Y %H:%M";

const COMPACT_UNITS: [&str; 5] = ["", "K", "M", "B", "T"];

/// Format an axis tick.
///
/// Timestamps render as a calendar string. Otherwise an increment below 1
/// forces enough decimals to show its first significant digit; larger or
/// missing increments use compact notation (`1.2K`, `35M`).
pub fn format_tick(value: f64, unit: UnitType, tick_increment: Option<f64>) -> String {
    if unit == UnitType::Timestamp {
        return format_timestamp(value);
    }

    let number = match decimal_places(tick_increment) {
        Some(places) => format!("{:.*}", places, normalize_zero(value)),
        None => format_compact(value),
    };

    format!("{}{}", number, unit.suffix())
}

/// Decimals needed for ticks spaced `tick_increment` apart, `None` when the
/// increment is absent, degenerate, or at least 1.
pub fn decimal_places(tick_increment: Option<f64>) -> Option<usize> {
    let increment = tick_increment?.abs();
    if !increment.is_finite() || increment == 0.0 || increment >= 1.0 {
        return None;
    }

    // 12 significant digits absorb float noise such as 0.09999999999999999
    let repr = format!("{:.11e}", increment);
    let exponent: i32 = repr.split_once('e').and_then(|(_, e)| e.parse().ok())?;
    (exponent < 0).then(|| exponent.unsigned_abs() as usize)
}

/// Compact notation with two significant digits (`1.2K`, `35M`).
pub fn format_compact(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // rounding first lets 999_999 carry into the next scale
    let rounded = format!("{:.1e}", value).parse::<f64>().unwrap_or(value);
    compact_formatter().fmt2(rounded).to_string()
}

/// en-US grouped rendering with at most three fraction digits.
pub fn format_locale(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    locale_formatter().fmt2(normalize_zero(value)).to_string()
}

fn compact_formatter() -> Formatter {
    let scales = Scales::new(1000, COMPACT_UNITS.to_vec()).unwrap_or_else(|_| Scales::short());
    Formatter::new().scales(scales).precision(Precision::Significance(2))
}

fn locale_formatter() -> Formatter {
    Formatter::new()
        .precision(Precision::Decimals(3))
        .separator(',')
        .unwrap_or_else(|_| Formatter::new().precision(Precision::Decimals(3)))
}

/// Epoch milliseconds in UTC, falling back to compact notation when out of range.
pub fn format_timestamp(millis: f64) -> String {
    if !millis.is_finite() {
        return format_compact(millis);
    }
    match DateTime::<Utc>::from_timestamp_millis(millis as i64) {
        Some(dt) => dt.format(TIMESTAMP_PATTERN).to_string(),
        None => format_compact(millis),
    }
}

fn normalize_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}
