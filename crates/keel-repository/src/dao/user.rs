//! User lookups, token resolution and the last-user delete guard.

use super::Dao;
use crate::Filter;
use chrono::{DateTime, Utc};
use keel_core::{BaseModel, KeelError, KeelResult, User};
use keel_security::{parse_unverified, parse_verified};
use sqlx::FromRow;
use tracing::debug;

/// Database row representation of a user.
#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    email: String,
    token_key: String,
    password_hash: String,
    is_admin: bool,
    is_superadmin: bool,
    last_reset_sent_at: Option<DateTime<Utc>>,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            base: BaseModel::persisted(row.id, row.created, row.updated),
            email: row.email,
            token_key: row.token_key,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            is_superadmin: row.is_superadmin,
            last_reset_sent_at: row.last_reset_sent_at,
        }
    }
}

impl Dao {
    pub async fn find_user_by_id(&self, id: &str) -> KeelResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let row: Option<UserRow> = self.concurrent_db().select_one("users", &Filter::by_id(id)).await?;
        Ok(row.map(User::from))
    }

    /// Finds a user by email.
    ///
    /// The plain `=` filter matches case-insensitively only because the
    /// `users.email` column is declared `COLLATE NOCASE` in the users
    /// migration.
    pub async fn find_user_by_email(&self, email: &str) -> KeelResult<Option<User>> {
        debug!("Finding user by email: {}", email);

        let row: Option<UserRow> = self
            .concurrent_db()
            .select_one("users", &Filter::new().eq("email", email))
            .await?;
        Ok(row.map(User::from))
    }

    /// Resolves the owner of a signed user token.
    ///
    /// The token must verify against the owner's token key followed by
    /// `base_key`, so rotating the token key revokes every token issued
    /// before the rotation.
    pub async fn find_user_by_token(&self, token: &str, base_key: &str) -> KeelResult<User> {
        let claims = parse_unverified(token)?;
        if claims.id.is_empty() {
            return Err(KeelError::InvalidToken("missing or invalid token claims".to_string()));
        }

        let user = self
            .find_user_by_id(&claims.id)
            .await?
            .ok_or_else(|| KeelError::not_found("user", &claims.id))?;

        parse_verified(token, &format!("{}{}", user.token_key, base_key))?;

        Ok(user)
    }

    pub async fn total_users(&self) -> KeelResult<i64> {
        self.concurrent_db().count("users", &Filter::new()).await
    }

    /// Checks that no other user owns `email`. Users listed in
    /// `exclude_ids` are not taken into account.
    pub async fn is_user_email_unique(&self, email: &str, exclude_ids: &[&str]) -> KeelResult<bool> {
        if email.is_empty() {
            return Ok(false);
        }

        let filter = Filter::new()
            .eq("email", email)
            .not_in("id", exclude_ids.iter().copied());
        let total = self.concurrent_db().count("users", &filter).await?;
        Ok(total == 0)
    }

    /// Deletes `user`, refusing to delete the only remaining account.
    pub async fn delete_user(&self, user: &mut User) -> KeelResult<()> {
        if self.total_users().await? == 1 {
            return Err(KeelError::OnlyUser);
        }

        self.delete(user).await
    }

    /// Creates or updates `user`.
    pub async fn save_user(&self, user: &mut User) -> KeelResult<()> {
        self.save(user).await
    }
}
