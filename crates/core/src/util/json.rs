//! Defensive JSON helpers.
//!
//! `safe_stringify` falls back to `"{}"` on serialization failure; a payload
//! that cannot serialize is lost rather than crashing the host. This mirrors
//! the upstream trade-off and is deliberately kept.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Serializes to a JSON string, falling back to `"{}"` on failure.
pub fn safe_stringify<T: Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "payload serialization failed, substituting empty object");
            "{}".to_string()
        }
    }
}

/// Converts to a `Value`, falling back to `Value::Null` on failure.
pub fn safe_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// True for scalar JSON values (null/bool/number/string).
pub fn is_scalar(value: &Value) -> bool {
    matches!(
        value,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_safe_stringify_ok() {
        let map = BTreeMap::from([("a", 1)]);
        assert_eq!(safe_stringify(&map), r#"{"a":1}"#);
    }

    #[test]
    fn test_safe_stringify_failure_yields_empty_object() {
        // Maps with non-string keys fail JSON serialization.
        let bad: BTreeMap<Vec<u8>, u8> = BTreeMap::from([(vec![1u8], 1u8)]);
        assert_eq!(safe_stringify(&bad), "{}");
    }

    #[test]
    fn test_is_scalar() {
        assert!(is_scalar(&Value::Null));
        assert!(is_scalar(&Value::from(3)));
        assert!(is_scalar(&Value::from("x")));
        assert!(!is_scalar(&serde_json::json!({})));
        assert!(!is_scalar(&serde_json::json!([])));
    }
}
