//! Issuing of user tokens.
//!
//! Every user token is signed with the user's token key followed by the
//! secret of the token kind, so rotating the token key revokes all of
//! them at once.

use keel_core::{KeelResult, Model, Settings, User};
use keel_security::{new_token, sign_token, Claims, TOKEN_TYPE_USER};

/// Creates a bearer token for `user`.
pub fn new_user_auth_token(user: &User, settings: &Settings) -> KeelResult<String> {
    new_token(
        user.id(),
        TOKEN_TYPE_USER,
        &signing_key(user, &settings.user_auth_token.secret),
        settings.user_auth_token.duration,
    )
}

/// Creates a password reset token for `user`. The token also carries the
/// user's email.
pub fn new_user_reset_password_token(user: &User, settings: &Settings) -> KeelResult<String> {
    let claims = Claims::new(user.id(), TOKEN_TYPE_USER, settings.user_password_reset_token.duration)
        .with_email(&user.email);
    sign_token(
        &claims,
        &signing_key(user, &settings.user_password_reset_token.secret),
    )
}

fn signing_key(user: &User, secret: &str) -> String {
    format!("{}{}", user.token_key, secret)
}
