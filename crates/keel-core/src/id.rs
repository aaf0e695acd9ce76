//! Identifier and random secret generation.

use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

/// Length of generated per-user token keys and default settings secrets.
pub const SECRET_LENGTH: usize = 50;

/// Generates a new application-side record identifier.
///
/// Identifiers are time-ordered UUIDv7 strings so that freshly inserted
/// records sort after older ones.
#[must_use]
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Generates a random alphanumeric string of the given length using the
/// thread-local CSPRNG.
#[must_use]
pub fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
