use super::Dao;
use keel_core::{KeelError, KeelResult, Settings, PARAM_APP_SETTINGS};

impl Dao {
    /// Loads the stored settings merged onto the defaults.
    ///
    /// Returns `None` when no settings have been saved yet.
    pub async fn find_settings(&self) -> KeelResult<Option<Settings>> {
        let Some(param) = self.find_param_by_key(PARAM_APP_SETTINGS).await? else {
            return Ok(None);
        };

        Settings::from_stored(param.value)
            .map(Some)
            .map_err(|e| KeelError::internal(format!("failed to load the stored app settings: {e}")))
    }

    /// Persists `settings` as the settings param.
    pub async fn save_settings(&self, settings: &Settings) -> KeelResult<()> {
        self.save_param(PARAM_APP_SETTINGS, settings).await?;
        Ok(())
    }
}
