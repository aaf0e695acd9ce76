//! JWT claims structure.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token type of user authentication and password reset tokens.
pub const TOKEN_TYPE_USER: &str = "user";

/// Claims carried by every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identifier of the principal the token was issued for.
    #[serde(default)]
    pub id: String,

    /// Principal kind, e.g. [`TOKEN_TYPE_USER`].
    #[serde(rename = "type", default)]
    pub token_type: String,

    /// Email the token is bound to (password reset tokens only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issued at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates claims valid for `duration_secs` from now.
    #[must_use]
    pub fn new(id: impl Into<String>, token_type: impl Into<String>, duration_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            token_type: token_type.into(),
            email: None,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(duration_secs)).timestamp(),
        }
    }

    /// Binds the claims to an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Checks if the token is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Checks if this token was issued for a user.
    #[must_use]
    pub fn is_user_token(&self) -> bool {
        self.token_type == TOKEN_TYPE_USER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_claims() {
        let claims = Claims::new("abc", TOKEN_TYPE_USER, 3600);
        assert_eq!(claims.id, "abc");
        assert!(claims.is_user_token());
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_type_claim_name() {
        let claims = Claims::new("abc", TOKEN_TYPE_USER, 60).with_email("a@b.c");
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["email"], "a@b.c");

        let without_email = serde_json::to_value(Claims::new("abc", TOKEN_TYPE_USER, 60)).unwrap();
        assert!(without_email.get("email").is_none());
    }

    #[test]
    fn test_expired_claims() {
        let claims = Claims::new("abc", TOKEN_TYPE_USER, -10);
        assert!(claims.is_expired());
    }
}
