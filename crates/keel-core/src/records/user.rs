//! User account record.

use crate::{
    columns, random_string, BaseModel, ColumnMap, KeelError, KeelResult, Model, PasswordHashing,
    SECRET_LENGTH,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account that can authenticate against the application.
///
/// `token_key` is part of every issued token's signing key, so rotating it
/// revokes all tokens issued before the rotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub base: BaseModel,
    pub email: String,
    #[serde(skip)]
    pub token_key: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_superadmin: bool,
    #[serde(skip)]
    pub last_reset_sent_at: Option<DateTime<Utc>>,
}

impl User {
    /// Creates a new, not yet persisted user with a fresh token key.
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        let mut user = Self {
            email: email.into(),
            ..Self::default()
        };
        user.refresh_token_key();
        user
    }

    /// Checks a plain password against the stored hash.
    pub fn validate_password(&self, hasher: &dyn PasswordHashing, password: &str) -> bool {
        if self.password_hash.is_empty() {
            return false;
        }
        hasher.verify(password, &self.password_hash).unwrap_or(false)
    }

    /// Hashes and stores a new password.
    ///
    /// Also clears the password reset marker and rotates the token key, so
    /// every previously issued token stops verifying.
    pub fn set_password(&mut self, hasher: &dyn PasswordHashing, password: &str) -> KeelResult<()> {
        if password.is_empty() {
            return Err(KeelError::validation("the provided plain password is empty"));
        }

        self.password_hash = hasher.hash(password)?;
        self.last_reset_sent_at = None;
        self.refresh_token_key();

        Ok(())
    }

    /// Replaces the token key with a new random one.
    pub fn refresh_token_key(&mut self) {
        self.token_key = random_string(SECRET_LENGTH);
    }

    /// Marks that a password reset was just requested.
    pub fn refresh_last_reset_sent_at(&mut self) {
        self.last_reset_sent_at = Some(Utc::now());
    }
}

impl Model for User {
    fn table_name(&self) -> &'static str {
        "users"
    }

    fn base(&self) -> &BaseModel {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        &mut self.base
    }

    fn columns(&self) -> ColumnMap {
        columns! {
            "email" => self.email.as_str(),
            "token_key" => self.token_key.as_str(),
            "password_hash" => self.password_hash.as_str(),
            "is_admin" => self.is_admin,
            "is_superadmin" => self.is_superadmin,
            "last_reset_sent_at" => self.last_reset_sent_at,
        }
    }
}
