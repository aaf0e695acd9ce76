//! Authentication service implementation.

use crate::dto::{AuthResponse, PasswordResetConfirm, PasswordResetRequest, UserLogin};
use crate::events::UserAuthEvent;
use crate::tokens::{new_user_auth_token, new_user_reset_password_token};
use crate::BaseApp;
use chrono::{Duration, Utc};
use keel_core::{BoxFuture, KeelError, KeelResult, Model, User, ValidateExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Minimum time between two password reset requests of the same user.
pub const PASSWORD_RESET_RESEND_SECS: i64 = 120;

const BEARER_PREFIX: &str = "Bearer ";

/// User authentication: password login, token issuing and revocation,
/// password reset.
#[derive(Debug, Clone)]
pub struct AuthService {
    app: Arc<BaseApp>,
}

impl AuthService {
    #[must_use]
    pub fn new(app: Arc<BaseApp>) -> Self {
        Self { app }
    }

    /// Checks an email and password pair and returns the matching user.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn authenticate_with_password(&self, form: &UserLogin) -> KeelResult<User> {
        debug!("Login attempt for: {}", form.email);

        form.validate_request()?;

        let user = self
            .app
            .dao()?
            .find_user_by_email(&form.email)
            .await?
            .ok_or_else(|| {
                warn!("Login failed: user not found - {}", form.email);
                KeelError::InvalidCredentials
            })?;

        if !user.validate_password(self.app.password_hasher(), &form.password) {
            warn!("Login failed: invalid password - {}", user.id());
            return Err(KeelError::InvalidCredentials);
        }

        info!("User logged in: {}", user.id());
        Ok(user)
    }

    /// Logs in with a password and returns the auth response.
    pub async fn login(&self, form: &UserLogin) -> KeelResult<Option<AuthResponse>> {
        let user = self.authenticate_with_password(form).await?;
        self.auth_response(user).await
    }

    /// Issues a token for `user` and runs the user auth hook.
    ///
    /// Returns `None` when a handler stopped propagation, in which case
    /// the handler is responsible for the response.
    pub async fn auth_response(&self, user: User) -> KeelResult<Option<AuthResponse>> {
        let token = new_user_auth_token(&user, &self.app.settings())?;

        let mut event = UserAuthEvent {
            user,
            token,
            response: None,
        };
        self.app
            .hooks()
            .on_user_auth_request
            .trigger_with(&mut event, default_auth_response)
            .await?;

        Ok(event.response)
    }

    /// Revokes every token of `user` and issues a new one.
    pub async fn refresh_auth(&self, user: &mut User) -> KeelResult<Option<AuthResponse>> {
        self.rotate_token_key(user).await?;
        info!("Token refreshed for user: {}", user.id());
        self.auth_response(user.clone()).await
    }

    /// Revokes every token of `user`.
    pub async fn logout(&self, user: &mut User) -> KeelResult<()> {
        self.rotate_token_key(user).await?;
        info!("User logged out: {}", user.id());
        Ok(())
    }

    /// Resolves the user of an `Authorization` header value. The
    /// `Bearer ` prefix is optional.
    pub async fn find_user_by_bearer(&self, header: &str) -> KeelResult<User> {
        let token = header.strip_prefix(BEARER_PREFIX).unwrap_or(header).trim();
        if token.is_empty() {
            return Err(KeelError::unauthorized("Missing auth token"));
        }

        let settings = self.app.settings();
        self.app
            .dao()?
            .find_user_by_token(token, &settings.user_auth_token.secret)
            .await
    }

    /// Issues a password reset token for the user owning `form.email`.
    ///
    /// Requests repeated within [`PASSWORD_RESET_RESEND_SECS`] are
    /// rejected. Delivering the token is up to the caller.
    pub async fn request_password_reset(&self, form: &PasswordResetRequest) -> KeelResult<String> {
        form.validate_request()?;

        let dao = self.app.dao()?;
        let mut user = dao
            .find_user_by_email(&form.email)
            .await?
            .ok_or_else(|| KeelError::not_found("user", &form.email))?;

        if let Some(sent_at) = user.last_reset_sent_at {
            if Utc::now() - sent_at < Duration::seconds(PASSWORD_RESET_RESEND_SECS) {
                return Err(KeelError::validation("You've already requested a password reset."));
            }
        }

        let token = new_user_reset_password_token(&user, &self.app.settings())?;
        user.refresh_last_reset_sent_at();
        dao.save_user(&mut user).await?;

        info!("Password reset requested for user: {}", user.id());
        Ok(token)
    }

    /// Sets a new password with a reset token.
    ///
    /// Setting the password rotates the token key, so the reset token and
    /// every auth token issued before stop working.
    pub async fn confirm_password_reset(&self, form: &PasswordResetConfirm) -> KeelResult<User> {
        form.validate_request()?;

        let dao = self.app.dao()?;
        let settings = self.app.settings();
        let mut user = dao
            .find_user_by_token(&form.token, &settings.user_password_reset_token.secret)
            .await?;

        user.set_password(self.app.password_hasher(), &form.password)?;
        dao.save_user(&mut user).await?;

        info!("Password reset for user: {}", user.id());
        Ok(user)
    }

    async fn rotate_token_key(&self, user: &mut User) -> KeelResult<()> {
        user.refresh_token_key();
        self.app.dao()?.save_user(user).await
    }
}

fn default_auth_response(event: &mut UserAuthEvent) -> BoxFuture<'_, ()> {
    event.response = Some(AuthResponse {
        token: event.token.clone(),
        user: event.user.clone(),
    });
    Box::pin(async { Ok(()) })
}
