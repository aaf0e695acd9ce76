//! Built-in persisted records.

mod param;
mod user;

pub use param::*;
pub use user::*;
