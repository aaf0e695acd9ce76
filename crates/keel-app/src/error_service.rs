//! Rendering of API errors through the API error hooks.

use crate::events::ApiErrorEvent;
use crate::BaseApp;
use keel_core::{BoxFuture, ErrorResponse, KeelError};
use std::sync::Arc;
use tracing::{error, warn};

const GENERIC_ERROR_MESSAGE: &str = "Something went wrong while processing your request.";

#[derive(Debug, Clone)]
pub struct ErrorService {
    app: Arc<BaseApp>,
}

impl ErrorService {
    #[must_use]
    pub fn new(app: Arc<BaseApp>) -> Self {
        Self { app }
    }

    /// Builds the response for `err` and runs the API error hooks.
    ///
    /// Server errors are masked unless the application runs in debug
    /// mode. Returns `None` when a before handler stopped propagation
    /// without rendering a response itself.
    pub async fn handle_api_error(&self, err: &KeelError) -> Option<ErrorResponse> {
        let status = err.status_code();
        let mut response = ErrorResponse::from_error(err);
        if status >= 500 {
            error!("Request failed: {}", err);
            if !self.app.is_debug() {
                response.message = GENERIC_ERROR_MESSAGE.to_string();
            }
        }

        let mut event = ApiErrorEvent {
            status,
            response,
            rendered: None,
        };

        let hooks = self.app.hooks();
        if let Err(hook_err) = hooks
            .on_before_api_error
            .trigger_with(&mut event, render_error_response)
            .await
        {
            warn!("Before API error hook failed: {}", hook_err);
        }

        if let Err(hook_err) = hooks.on_after_api_error.trigger(&mut event).await {
            warn!("After API error hook failed: {}", hook_err);
        }

        event.rendered
    }
}

fn render_error_response(event: &mut ApiErrorEvent) -> BoxFuture<'_, ()> {
    event.rendered = Some(event.response.clone());
    Box::pin(async { Ok(()) })
}
