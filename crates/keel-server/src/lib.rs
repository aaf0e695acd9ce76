//! # Keel Server Library
//!
//! Process startup utilities: logging initialization, the startup
//! sequence of a [`keel_app::BaseApp`] and shutdown signal handling.

pub mod startup;
