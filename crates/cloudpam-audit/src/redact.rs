use serde_json::Value;

/// Field names whose values must never reach an audit sink verbatim (`spec.md` §4.8: "secrets
/// redacted").
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "password_hash",
    "secret",
    "api_key_secret",
    "token_hash",
    "credential_hash",
    "token",
    "authorization",
];

/// Recursively replaces sensitive object values with a redaction marker, leaving shape and all
/// other fields intact so diffs stay legible.
#[must_use]
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let redacted = if is_sensitive_key(k) {
                        Value::String("[redacted]".to_owned())
                    } else {
                        redact(v)
                    };
                    (k.clone(), redacted)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEYS.iter().any(|s| lower.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_known_sensitive_keys() {
        let input = json!({
            "name": "agent-1",
            "api_key_secret": "cpam_abc123",
            "nested": { "password_hash": "argon2...", "keep": "me" },
        });
        let out = redact(&input);
        assert_eq!(out["name"], "agent-1");
        assert_eq!(out["api_key_secret"], "[redacted]");
        assert_eq!(out["nested"]["password_hash"], "[redacted]");
        assert_eq!(out["nested"]["keep"], "me");
    }

    #[test]
    fn redacts_inside_arrays() {
        let input = json!([{ "token": "x" }, { "name": "ok" }]);
        let out = redact(&input);
        assert_eq!(out[0]["token"], "[redacted]");
        assert_eq!(out[1]["name"], "ok");
    }

    #[test]
    fn non_object_values_pass_through() {
        assert_eq!(redact(&json!(42)), json!(42));
        assert_eq!(redact(&json!("plain")), json!("plain"));
    }
}
