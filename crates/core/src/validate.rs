//! Form-input validation: bounds clamping for numeric fields, trimming and
//! length caps for text fields. Invalid numeric input falls back to a
//! field-specific default instead of failing the request; only a blank
//! required name is an error, and callers skip just that entity's write.

use thiserror::Error;

pub const TEA_NAME_MAX: usize = 100;
pub const TEA_TYPE_MAX: usize = 50;
pub const SELLER_MAX: usize = 100;
pub const NOTES_MAX: usize = 1000;
pub const REVIEW_MAX: usize = 500;
pub const LOCATION_NAME_MAX: usize = 50;
pub const LOCATION_DESC_MAX: usize = 100;

pub const DOSE_MIN: f64 = 0.1;
pub const DOSE_MAX: f64 = 100.0;
pub const PRICE_MAX: f64 = 10_000.0;
pub const GRAMS_MAX: f64 = 100_000.0;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    EmptyName { field: &'static str },
}

/// Trim and cap a free-text field. Missing input reads as empty.
pub fn trimmed(value: Option<&str>, max_len: usize) -> String {
    let text = value.unwrap_or_default().trim();
    match text.char_indices().nth(max_len) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Parse a numeric field, clamping to `[min, max]`. Blank or unparseable
/// input (including non-finite values) yields `default` unclamped.
pub fn clamped_float(value: Option<&str>, default: f64, min: f64, max: f64) -> f64 {
    let raw = value.unwrap_or_default().trim();
    if raw.is_empty() {
        return default;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v.clamp(min, max),
        _ => default,
    }
}

pub fn tea_name(value: Option<&str>) -> Result<String, ValidationError> {
    let name = trimmed(value, TEA_NAME_MAX);
    if name.is_empty() {
        return Err(ValidationError::EmptyName { field: "tea name" });
    }
    Ok(name)
}

pub fn location_name(value: Option<&str>) -> Result<String, ValidationError> {
    let name = trimmed(value, LOCATION_NAME_MAX);
    if name.is_empty() {
        return Err(ValidationError::EmptyName {
            field: "location name",
        });
    }
    Ok(name)
}

/// Dose input. Blank or malformed input leaves the dose unset (0); the brew
/// flow substitutes the fallback dose at consumption time.
pub fn dose(value: Option<&str>) -> f64 {
    clamped_float(value, 0.0, DOSE_MIN, DOSE_MAX)
}

pub fn price(value: Option<&str>) -> f64 {
    clamped_float(value, 0.0, 0.0, PRICE_MAX)
}

/// Gram quantities: `grams_bought` and per-location amounts share bounds.
pub fn grams(value: Option<&str>) -> f64 {
    clamped_float(value, 0.0, 0.0, GRAMS_MAX)
}
