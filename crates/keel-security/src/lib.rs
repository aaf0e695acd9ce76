//! # Keel Security
//!
//! Bearer token signing and verification and Argon2 password hashing.
//! Tokens are signed with a per-principal key, so rotating that key
//! revokes every token issued with it.

pub mod jwt;
pub mod password;

pub use jwt::*;
pub use password::*;
