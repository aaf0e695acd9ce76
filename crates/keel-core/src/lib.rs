//! # Keel Core
//!
//! Core types shared by every Keel crate: the unified error type, the
//! persistable [`Model`] contract, the generic [`Hook`] event chain, the
//! application [`Settings`] and the built-in `Param` and `User` records.

pub mod column;
pub mod error;
pub mod hook;
pub mod id;
pub mod model;
pub mod records;
pub mod result;
pub mod settings;
pub mod store;
pub mod traits;
pub mod validation;

pub use column::*;
pub use error::*;
pub use hook::*;
pub use id::*;
pub use model::*;
pub use records::*;
pub use result::*;
pub use settings::*;
pub use store::*;
pub use traits::*;
pub use validation::*;
