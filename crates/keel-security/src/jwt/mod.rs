//! JWT token management.

mod claims;
mod token;

pub use claims::*;
pub use token::*;
