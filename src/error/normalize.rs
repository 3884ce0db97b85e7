//! Human-readable message extraction from heterogeneous failure shapes.
//!
//! Wallets, nodes and HTTP gateways all report failures differently. The
//! normalizer inspects a JSON view of the failure in a fixed priority order:
//!
//! 1. `response.data.message`
//! 2. `response.data.error`
//! 3. `response.error`
//! 4. `message`
//!
//! Falsy values (`null`, `false`, `0`, `""`) are skipped. A hit that is not a
//! string is JSON-serialized.

use serde_json::Value;

/// Returned when no field yields a message.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred";

/// Extract a display message from a failure value.
pub fn extract_error_message(error: &Value) -> String {
    let candidates = [
        lookup(error, &["response", "data", "message"]),
        lookup(error, &["response", "data", "error"]),
        lookup(error, &["response", "error"]),
        lookup(error, &["message"]),
    ];

    candidates
        .into_iter()
        .flatten()
        .find(|v| is_truthy(v))
        .map(as_display_string)
        .unwrap_or_else(|| UNKNOWN_ERROR.to_string())
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.as_object()?.get(*key))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn as_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
