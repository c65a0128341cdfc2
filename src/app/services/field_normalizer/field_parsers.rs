//! Field parsing utilities for normalized customs tokens
//!
//! Coercion helpers for the typed field kinds of the index schema. Input is
//! expected to have passed decimal normalization and sentinel nulling
//! already; these functions only decide whether the text is a valid value.

use chrono::NaiveDate;

use super::error::FieldError;
use crate::app::models::FieldValue;
use crate::constants::{SOURCE_DATE_PATTERN, TWO_DIGIT_YEAR_PIVOT};
use crate::schema::FieldType;

/// Coerce normalized text to the declared field type
pub fn coerce(field: &str, value: &str, field_type: FieldType) -> Result<FieldValue, FieldError> {
    match field_type {
        FieldType::Keyword | FieldType::Text => Ok(FieldValue::Text(value.to_string())),
        FieldType::Integer => parse_integer(field, value).map(FieldValue::Integer),
        FieldType::Float => parse_float(field, value).map(FieldValue::Float),
        FieldType::Date => parse_date(field, value).map(FieldValue::Date),
    }
}

/// Parse a whole number that fits the index's 32-bit `integer` type
pub fn parse_integer(field: &str, value: &str) -> Result<i64, FieldError> {
    let trimmed = value.trim();
    let parsed = trimmed
        .parse::<i64>()
        .map_err(|e| FieldError::new(field, value, FieldType::Integer, e.to_string()))?;

    i32::try_from(parsed).map_err(|_| {
        FieldError::new(
            field,
            value,
            FieldType::Integer,
            "out of range for a 32-bit integer",
        )
    })?;

    Ok(parsed)
}

/// Parse a decimal number that stays finite as the index's 32-bit `float`
pub fn parse_float(field: &str, value: &str) -> Result<f64, FieldError> {
    let trimmed = value.trim();
    let parsed = trimmed
        .parse::<f64>()
        .map_err(|e| FieldError::new(field, value, FieldType::Float, e.to_string()))?;

    if !parsed.is_finite() {
        return Err(FieldError::new(
            field,
            value,
            FieldType::Float,
            "value is not finite",
        ));
    }
    if !(parsed as f32).is_finite() {
        return Err(FieldError::new(
            field,
            value,
            FieldType::Float,
            "out of range for a 32-bit float",
        ));
    }

    Ok(parsed)
}

/// Parse a `dd.MM.yy` date
///
/// Day and month may have one or two digits; the year must have exactly
/// two. Years below the pivot are 20xx, the rest 19xx.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, FieldError> {
    let trimmed = value.trim();
    let invalid = |reason: &str| FieldError::new(field, value, FieldType::Date, reason);

    let parts: Vec<&str> = trimmed.split('.').collect();
    let [day, month, year] = parts.as_slice() else {
        return Err(invalid(&format!("expected {}", SOURCE_DATE_PATTERN)));
    };

    let day = date_component(day, 1, 2).ok_or_else(|| invalid("invalid day"))?;
    let month = date_component(month, 1, 2).ok_or_else(|| invalid("invalid month"))?;
    let year = date_component(year, 2, 2).ok_or_else(|| invalid("invalid two-digit year"))?;

    let year = year as i32;
    let full_year = if year < TWO_DIGIT_YEAR_PIVOT {
        2000 + year
    } else {
        1900 + year
    };

    NaiveDate::from_ymd_opt(full_year, month, day).ok_or_else(|| invalid("no such calendar date"))
}

fn date_component(text: &str, min_digits: usize, max_digits: usize) -> Option<u32> {
    if text.len() < min_digits
        || text.len() > max_digits
        || !text.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    text.parse().ok()
}
