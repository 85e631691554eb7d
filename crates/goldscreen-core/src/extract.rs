//! Safe numeric extraction from loosely-typed provider records.

use serde_json::{Map, Value};

/// Extract a floating-point metric from a loosely-typed record.
///
/// Returns `reject` when the key is absent, null, or the value cannot be
/// interpreted as a real number. Numeric strings are accepted — some
/// provider fields arrive stringly typed. This function never fails.
///
/// The sentinel is a filter-design decision: callers pick a value that
/// deterministically fails the comparison the metric feeds into (a large
/// value for "must be below" filters, a below-threshold value for "must be
/// above" filters).
pub fn safe_f64(record: &Map<String, Value>, key: &str, reject: f64) -> f64 {
    match record.get(key) {
        Some(Value::Number(number)) => number.as_f64().filter(|v| v.is_finite()).unwrap_or(reject),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(reject),
        _ => reject,
    }
}
