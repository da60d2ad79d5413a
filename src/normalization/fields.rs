//! Tolerant field extraction over loosely-specified supplier payloads.
//!
//! The same datum may arrive under several casings/names depending on the
//! supplier and endpoint revision. Each canonical field is resolved by
//! walking an ordered candidate-key list and taking the first present
//! non-null value; an exact-key pass runs before a case-insensitive pass so
//! the documented spelling always wins.

use serde_json::Value;

pub fn pick<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = value.as_object()?;
    for key in keys {
        if let Some(v) = obj.get(*key) {
            if !v.is_null() {
                return Some(v);
            }
        }
    }
    for key in keys {
        for (k, v) in obj {
            if k.eq_ignore_ascii_case(key) && !v.is_null() {
                return Some(v);
            }
        }
    }
    None
}

pub fn pick_str(value: &Value, keys: &[&str]) -> Option<String> {
    match pick(value, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numeric extraction accepting numbers or numeric strings; `None` when the
/// field is absent under every alias or unparsable.
pub fn pick_f64_opt(value: &Value, keys: &[&str]) -> Option<f64> {
    match pick(value, keys)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_start_matches('$').parse::<f64>().ok(),
        _ => None,
    }
}

/// Numeric extraction with the zero default the unified model requires.
pub fn pick_f64(value: &Value, keys: &[&str]) -> f64 {
    pick_f64_opt(value, keys).unwrap_or(0.0)
}

pub fn pick_u64(value: &Value, keys: &[&str]) -> u64 {
    match pick(value, keys) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or_else(|| {
            // Negative or fractional counts clamp to zero.
            n.as_f64().map(|f| f.max(0.0) as u64).unwrap_or(0)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    }
}

/// Collection extraction; empty vec, never null, for missing collections.
pub fn pick_array<'a>(value: &'a Value, keys: &[&str]) -> Vec<&'a Value> {
    match pick(value, keys) {
        Some(Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}
