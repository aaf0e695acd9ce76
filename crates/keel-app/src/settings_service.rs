//! Settings listing and updating.

use crate::events::{SettingsListEvent, SettingsUpdateEvent};
use crate::BaseApp;
use keel_core::{KeelResult, Settings, ValidateExt};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SettingsService {
    app: Arc<BaseApp>,
}

impl SettingsService {
    #[must_use]
    pub fn new(app: Arc<BaseApp>) -> Self {
        Self { app }
    }

    /// Returns the current settings with secrets masked, as left by the
    /// settings list hook.
    pub async fn list_settings(&self) -> KeelResult<Settings> {
        let mut event = SettingsListEvent {
            redacted_settings: self.app.settings().redacted(),
        };
        self.app
            .hooks()
            .on_settings_list_request
            .trigger(&mut event)
            .await?;

        Ok(event.redacted_settings)
    }

    /// Merges `patch` into the current settings, validates and persists
    /// the result, then reloads the application settings.
    ///
    /// Returns the new settings with secrets masked.
    pub async fn update_settings(&self, patch: Value) -> KeelResult<Settings> {
        let old_settings = (*self.app.settings()).clone();
        let mut new_settings = old_settings.clone();
        new_settings.merge_value(patch)?;
        new_settings.validate_request()?;

        let mut event = SettingsUpdateEvent {
            old_settings,
            new_settings,
        };
        let hooks = self.app.hooks();
        hooks.on_settings_before_update_request.trigger(&mut event).await?;

        self.app.dao()?.save_settings(&event.new_settings).await?;
        self.app.refresh_settings().await?;
        info!("Application settings updated");

        if let Err(err) = hooks.on_settings_after_update_request.trigger(&mut event).await {
            warn!("After settings update hook failed: {}", err);
        }

        Ok(self.app.settings().redacted())
    }
}
