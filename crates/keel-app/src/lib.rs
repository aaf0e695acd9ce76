//! # Keel App
//!
//! The application layer: the [`BaseApp`] instance with its hooks, cache
//! and settings, and the services built on top of it.

pub mod app;
pub mod auth_service;
pub mod dto;
pub mod error_service;
pub mod events;
pub mod hooks;
pub mod settings_service;
pub mod tokens;

pub use app::*;
pub use auth_service::*;
pub use dto::*;
pub use error_service::*;
pub use events::*;
pub use hooks::*;
pub use settings_service::*;
pub use tokens::*;
