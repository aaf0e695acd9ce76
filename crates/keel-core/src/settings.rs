//! Application settings persisted as a single JSON blob.

use crate::{random_string, KeelError, KeelResult, SECRET_LENGTH};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

const REDACTED: &str = "******";

/// Runtime application settings.
///
/// Keys unknown to this version are kept in `extra` so that a stored blob
/// survives a load and save round trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[validate(nested)]
    pub meta: MetaSettings,
    #[validate(nested)]
    pub user_auth_token: TokenSettings,
    #[validate(nested)]
    pub user_password_reset_token: TokenSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MetaSettings {
    #[validate(length(min = 1, max = 255))]
    pub app_name: String,
    #[validate(length(min = 1))]
    pub app_url: String,
}

/// Signing secret and lifetime (in seconds) of one token kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TokenSettings {
    #[validate(length(min = 30, max = 300))]
    pub secret: String,
    #[validate(range(min = 5, max = 63_072_000))]
    pub duration: i64,
}

impl Settings {
    /// Creates default settings with freshly generated secrets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            meta: MetaSettings {
                app_name: "Keel".to_string(),
                app_url: "http://localhost:8090".to_string(),
            },
            user_auth_token: TokenSettings {
                secret: random_string(SECRET_LENGTH),
                duration: 1_209_600,
            },
            user_password_reset_token: TokenSettings {
                secret: random_string(SECRET_LENGTH),
                duration: 1800,
            },
            extra: Map::new(),
        }
    }

    /// Decodes a stored blob on top of the defaults. Fields missing from
    /// the blob keep their default values; a null blob keeps all of them.
    pub fn from_stored(stored: Value) -> KeelResult<Self> {
        let mut settings = Self::new();
        if !stored.is_null() {
            settings.merge_value(stored)?;
        }
        Ok(settings)
    }

    /// Overwrites the fields present in `other`.
    pub fn merge(&mut self, other: &Self) -> KeelResult<()> {
        self.merge_value(serde_json::to_value(other)?)
    }

    /// Deep merges a JSON patch into these settings.
    pub fn merge_value(&mut self, patch: Value) -> KeelResult<()> {
        let mut current = serde_json::to_value(&*self)?;
        merge_json(&mut current, patch);
        *self = serde_json::from_value(current)
            .map_err(|e| KeelError::validation(format!("invalid settings: {e}")))?;
        Ok(())
    }

    /// Returns a copy with every secret masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut clone = self.clone();
        clone.user_auth_token.secret = REDACTED.to_string();
        clone.user_password_reset_token.secret = REDACTED.to_string();
        clone
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively merges `patch` into `target`. Objects merge key by key,
/// any other value replaces the target.
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidateExt;
    use serde_json::json;

    #[test]
    fn test_new_generates_distinct_secrets() {
        let a = Settings::new();
        let b = Settings::new();
        assert_eq!(a.user_auth_token.secret.len(), SECRET_LENGTH);
        assert_ne!(a.user_auth_token.secret, b.user_auth_token.secret);
        assert_ne!(a.user_auth_token.secret, a.user_password_reset_token.secret);
        assert!(a.validate_request().is_ok());
    }

    #[test]
    fn test_from_stored_keeps_defaults_and_unknown_keys() {
        let settings = Settings::from_stored(json!({
            "a": 1,
            "meta": { "appName": "Acme" }
        }))
        .unwrap();

        assert_eq!(settings.extra.get("a"), Some(&json!(1)));
        assert_eq!(settings.meta.app_name, "Acme");
        assert_eq!(settings.meta.app_url, "http://localhost:8090");
        assert_eq!(settings.user_auth_token.duration, 1_209_600);
    }

    #[test]
    fn test_from_stored_null_keeps_defaults() {
        let settings = Settings::from_stored(Value::Null).unwrap();

        assert_eq!(settings.meta, Settings::new().meta);
        assert_eq!(settings.user_auth_token.secret.len(), SECRET_LENGTH);
        assert!(settings.extra.is_empty());
    }

    #[test]
    fn test_from_stored_rejects_mistyped_blob() {
        assert!(Settings::from_stored(json!(42)).is_err());
        assert!(Settings::from_stored(json!({ "userAuthToken": { "duration": "x" } })).is_err());
    }

    #[test]
    fn test_merge_overwrites_with_other() {
        let mut current = Settings::new();
        let mut other = Settings::new();
        other.meta.app_name = "Other".to_string();
        other.extra.insert("feature".to_string(), json!(true));

        current.merge(&other).unwrap();
        assert_eq!(current, other);
    }

    #[test]
    fn test_redacted_masks_secrets() {
        let settings = Settings::new();
        let redacted = settings.redacted();
        assert_eq!(redacted.user_auth_token.secret, REDACTED);
        assert_eq!(redacted.user_password_reset_token.secret, REDACTED);
        assert_eq!(redacted.meta, settings.meta);
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut settings = Settings::new();
        settings.user_auth_token.secret = "short".to_string();
        assert!(matches!(
            settings.validate_request(),
            Err(KeelError::Validation(m)) if m.contains("userAuthToken") || m.contains("user_auth_token")
        ));
    }

    #[test]
    fn test_merge_json_nested() {
        let mut target = json!({ "a": { "b": 1, "c": 2 }, "d": [1] });
        merge_json(&mut target, json!({ "a": { "c": 3 }, "d": [2, 3] }));
        assert_eq!(target, json!({ "a": { "b": 1, "c": 3 }, "d": [2, 3] }));
    }
}
