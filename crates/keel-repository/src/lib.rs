//! # Keel Repository
//!
//! SQLite data access:
//!
//! ```text
//! Dao                 (record writes, lifecycle callbacks, transactions)
//!   ↓  DbHandle       (pool or open transaction)
//! DatabasePool        (concurrent pool + single-connection pool)
//!   ↓
//! SQLite
//! ```

pub mod dao;
pub mod db;
pub mod pool;

pub use dao::{AfterFunc, BeforeFunc, Dao, ModelAction};
pub use db::*;
pub use pool::*;
