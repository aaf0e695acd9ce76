//! The application hook registry.

use crate::events::{
    ApiErrorEvent, BootstrapEvent, ModelEvent, ServeEvent, SettingsListEvent, SettingsUpdateEvent,
    UserAuthEvent,
};
use keel_core::Hook;

/// Every hook the application triggers.
#[derive(Debug, Default)]
pub struct AppHooks {
    pub on_before_bootstrap: Hook<BootstrapEvent>,
    pub on_after_bootstrap: Hook<BootstrapEvent>,
    pub on_before_serve: Hook<ServeEvent>,

    pub on_before_api_error: Hook<ApiErrorEvent>,
    pub on_after_api_error: Hook<ApiErrorEvent>,

    pub on_model_before_create: Hook<ModelEvent>,
    pub on_model_after_create: Hook<ModelEvent>,
    pub on_model_before_update: Hook<ModelEvent>,
    pub on_model_after_update: Hook<ModelEvent>,
    pub on_model_before_delete: Hook<ModelEvent>,
    pub on_model_after_delete: Hook<ModelEvent>,

    pub on_settings_list_request: Hook<SettingsListEvent>,
    pub on_settings_before_update_request: Hook<SettingsUpdateEvent>,
    pub on_settings_after_update_request: Hook<SettingsUpdateEvent>,

    pub on_user_auth_request: Hook<UserAuthEvent>,
}

impl AppHooks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
