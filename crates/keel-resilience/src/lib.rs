//! # Keel Resilience
//!
//! Retry policies for transient storage failures.

pub mod retry;

pub use retry::*;
