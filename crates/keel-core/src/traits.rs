//! Capability traits implemented outside the core.

use crate::KeelResult;

/// One-way salted password hashing.
///
/// Records depend on this capability instead of a concrete algorithm so the
/// hashing implementation can live in the security crate.
pub trait PasswordHashing: Send + Sync {
    /// Hashes a plain-text password.
    fn hash(&self, password: &str) -> KeelResult<String>;

    /// Verifies a plain-text password against a stored hash.
    ///
    /// A mismatch is `Ok(false)`, not an error.
    fn verify(&self, password: &str, hash: &str) -> KeelResult<bool>;
}
