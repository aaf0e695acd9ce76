//! Event payloads passed to the application hooks.

use crate::{AuthResponse, BaseApp};
use keel_core::{ErrorResponse, Model, Settings, User};
use keel_repository::Dao;
use std::sync::Arc;

/// Payload of the bootstrap hooks.
pub struct BootstrapEvent {
    pub app: Arc<BaseApp>,
}

/// Payload of the before-serve hook.
pub struct ServeEvent {
    pub app: Arc<BaseApp>,
}

/// Payload of the model lifecycle hooks.
///
/// `dao` is the Dao that issued the write; queries made through it take
/// part in the same transaction.
pub struct ModelEvent {
    pub dao: Dao,
    pub model: Box<dyn Model>,
}

/// Payload of the API error hooks.
///
/// `rendered` is set once the error response has been produced.
#[derive(Debug, Clone)]
pub struct ApiErrorEvent {
    pub status: u16,
    pub response: ErrorResponse,
    pub rendered: Option<ErrorResponse>,
}

#[derive(Debug, Clone)]
pub struct SettingsListEvent {
    pub redacted_settings: Settings,
}

#[derive(Debug, Clone)]
pub struct SettingsUpdateEvent {
    pub old_settings: Settings,
    pub new_settings: Settings,
}

/// Payload of the user auth hook. `response` is filled by the default
/// handler unless a bound handler stops propagation first.
#[derive(Debug, Clone)]
pub struct UserAuthEvent {
    pub user: User,
    pub token: String,
    pub response: Option<AuthResponse>,
}
