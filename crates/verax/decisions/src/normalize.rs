//! Artifact normalization
//!
//! A pure, idempotent transform used for cross-run comparison: volatile
//! keys are stripped, machine-specific paths scrubbed, floats rounded to
//! three decimals, object keys sorted, arrays ordered canonically. The
//! transform never touches the decision record's adaptive-event count;
//! comparison consults that separately.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Keys that vary run to run without changing meaning.
pub const VOLATILE_KEYS: &[&str] = &[
    "id",
    "run_id",
    "decision_id",
    "timestamp",
    "recorded_at_iso",
    "at",
    "latency_ms",
    "elapsed_ms",
];

/// Machine-specific path prefixes scrubbed from strings.
const PATH_PREFIXES: &[&str] = &["/home/", "/Users/", "/tmp/", "/var/", "/private/"];

fn looks_like_machine_path(token: &str) -> bool {
    if PATH_PREFIXES.iter().any(|p| token.starts_with(p)) {
        return true;
    }
    // Windows drive paths.
    let bytes = token.as_bytes();
    bytes.len() > 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Replace machine-specific path tokens with a stable placeholder.
pub fn scrub_paths(s: &str) -> String {
    if !s.contains('/') && !s.contains('\\') {
        return s.to_string();
    }
    s.split(' ')
        .map(|token| {
            if looks_like_machine_path(token) {
                "<path>"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Normalize an artifact value. Idempotent: `normalize(normalize(x)) ==
/// normalize(x)`.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, v) in map {
                if VOLATILE_KEYS.contains(&key.as_str()) {
                    continue;
                }
                out.insert(key.clone(), normalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let mut normalized: Vec<Value> = items.iter().map(normalize).collect();
            // Canonical order by serialized identity.
            normalized.sort_by_key(|v| v.to_string());
            Value::Array(normalized)
        }
        Value::String(s) => Value::String(scrub_paths(s)),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if n.is_f64() {
                    return serde_json::Number::from_f64(round3(f))
                        .map(Value::Number)
                        .unwrap_or(Value::Null);
                }
            }
            value.clone()
        }
        other => other.clone(),
    }
}

/// SHA-256 over the canonical serialization of the normalized value.
pub fn normalized_hash(value: &Value) -> String {
    let canonical = normalize(value).to_string();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_volatile_keys_are_stripped() {
        let v = json!({
            "id": "f8a2",
            "run_id": "run-77",
            "judgment": "pass",
            "timestamp": "2026-08-01T00:00:00Z",
        });
        let n = normalize(&v);
        assert_eq!(n, json!({ "judgment": "pass" }));
    }

    #[test]
    fn test_paths_are_scrubbed_but_routes_survive() {
        let v = json!({
            "artifact": "/home/ci/workspace/out/findings.json",
            "target_path": "/dashboard",
        });
        let n = normalize(&v);
        assert_eq!(n["artifact"], "<path>");
        assert_eq!(n["target_path"], "/dashboard");
    }

    #[test]
    fn test_floats_round_to_three_decimals() {
        let v = json!({ "confidence": 0.333333, "count": 3 });
        let n = normalize(&v);
        assert_eq!(n["confidence"], 0.333);
        assert_eq!(n["count"], 3);
    }

    #[test]
    fn test_arrays_get_canonical_order() {
        let a = json!([{ "k": "b" }, { "k": "a" }]);
        let b = json!([{ "k": "a" }, { "k": "b" }]);
        assert_eq!(normalize(&a), normalize(&b));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let v = json!({
            "id": "x",
            "items": [{ "path": "/Users/dev/app/src/a.ts", "score": 0.123456 }, { "score": 2 }],
            "nested": { "timestamp": "t", "keep": ["/tmp/x y", "stay"] },
        });
        let once = normalize(&v);
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_hash_ignores_volatile_differences() {
        let a = json!({ "id": "1", "judgment": "pass", "confidence": 0.951 });
        let b = json!({ "id": "2", "judgment": "pass", "confidence": 0.951 });
        assert_eq!(normalized_hash(&a), normalized_hash(&b));
    }

    #[test]
    fn test_hash_sees_content_differences() {
        let a = json!({ "judgment": "pass" });
        let b = json!({ "judgment": "failure_silent" });
        assert_ne!(normalized_hash(&a), normalized_hash(&b));
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_normalize_idempotent(s in "[a-z/ ]{0,40}", f in -1000.0f64..1000.0) {
                let v = json!({ "text": s, "value": f, "list": [f, 1.0, s.clone()] });
                let once = normalize(&v);
                prop_assert_eq!(normalize(&once), once);
            }
        }
    }
}
