//! Signing and verification of HS256 bearer tokens.
//!
//! The signing key is supplied per call. User tokens are signed with the
//! user's token key concatenated with a server-side secret.

use super::Claims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use keel_core::{KeelError, KeelResult};
use tracing::warn;

/// Signs `claims` with `signing_key`.
pub fn sign_token(claims: &Claims, signing_key: &str) -> KeelResult<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(signing_key.as_bytes()),
    )
    .map_err(|e| KeelError::Internal(format!("Failed to sign token: {}", e)))
}

/// Creates and signs a token for principal `id`, valid for
/// `duration_secs`.
pub fn new_token(
    id: &str,
    token_type: &str,
    signing_key: &str,
    duration_secs: i64,
) -> KeelResult<String> {
    sign_token(&Claims::new(id, token_type, duration_secs), signing_key)
}

/// Decodes the claims without checking the signature or expiry.
///
/// Only use the result to decide which key verifies the token.
pub fn parse_unverified(token: &str) -> KeelResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| KeelError::InvalidToken(e.to_string()))
}

/// Decodes the claims, verifying signature and expiry against
/// `verification_key`.
pub fn parse_verified(token: &str, verification_key: &str) -> KeelResult<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_aud = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(verification_key.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        warn!("Token validation failed: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => KeelError::TokenExpired,
            ErrorKind::InvalidToken | ErrorKind::InvalidSignature => {
                KeelError::InvalidToken("Invalid token signature".to_string())
            }
            _ => KeelError::InvalidToken(e.to_string()),
        }
    })?;

    Ok(token_data.claims)
}
