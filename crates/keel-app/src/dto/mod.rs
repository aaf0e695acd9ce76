//! Request forms and response payloads.

pub mod auth_dto;

pub use auth_dto::*;
