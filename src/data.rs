use std::collections::BTreeMap;

use serde::Serialize;

use crate::classify::{FLOAT_PATTERN, INTEGER_PATTERN, is_null_token};

/// A converted cell value, ready for bulk load. Serializes untagged, so a
/// row materializes as a plain JSON object of scalars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// One converted row: sanitized field name to typed value.
pub type Row = BTreeMap<String, Value>;

const TRUE_TOKENS: &[&str] = &["true", "yes", "y", "1"];
const FALSE_TOKENS: &[&str] = &["false", "no", "n", "0"];

/// Coerces one raw value into its typed form.
///
/// Absent, blank, and literal-`null` inputs become [`Value::Null`]; boolean
/// tokens, integer-shaped, and decimal-shaped text become their native
/// types; everything else is kept as the trimmed string. An integer too
/// large for `i64` also falls back to the trimmed string.
pub fn convert_value(raw: Option<&str>) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };
    let trimmed = raw.trim();
    if is_null_token(trimmed) {
        return Value::Null;
    }

    let lowered = trimmed.to_ascii_lowercase();
    if TRUE_TOKENS.contains(&lowered.as_str()) {
        return Value::Boolean(true);
    }
    if FALSE_TOKENS.contains(&lowered.as_str()) {
        return Value::Boolean(false);
    }

    if INTEGER_PATTERN.is_match(trimmed) {
        if let Ok(parsed) = trimmed.parse::<i64>() {
            return Value::Integer(parsed);
        }
        return Value::String(trimmed.to_string());
    }
    if FLOAT_PATTERN.is_match(trimmed)
        && let Ok(parsed) = trimmed.parse::<f64>()
    {
        return Value::Float(parsed);
    }

    Value::String(trimmed.to_string())
}
