//! Settings and API error service tests.

mod common;

use common::TestApp;
use keel_app::{
    ApiErrorEvent, ErrorService, SettingsListEvent, SettingsService, SettingsUpdateEvent,
};
use keel_core::KeelError;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_list_settings_masks_secrets() {
    let test_app = TestApp::bootstrapped().await;
    let service = SettingsService::new(Arc::clone(&test_app.app));

    let listed = service.list_settings().await.unwrap();

    assert_eq!(listed.meta, test_app.app.settings().meta);
    assert_ne!(
        listed.user_auth_token.secret,
        test_app.app.settings().user_auth_token.secret
    );
}

#[tokio::test]
async fn test_list_hook_can_alter_result() {
    let test_app = TestApp::bootstrapped().await;
    test_app
        .app
        .hooks()
        .on_settings_list_request
        .bind(|e: &mut SettingsListEvent| {
            e.redacted_settings.meta.app_name = "Listed".to_string();
            Box::pin(async { Ok(()) })
        });

    let listed = SettingsService::new(Arc::clone(&test_app.app))
        .list_settings()
        .await
        .unwrap();

    assert_eq!(listed.meta.app_name, "Listed");
    assert_ne!(test_app.app.settings().meta.app_name, "Listed");
}

#[tokio::test]
async fn test_update_settings_persists_and_reloads() {
    let test_app = TestApp::bootstrapped().await;
    let service = SettingsService::new(Arc::clone(&test_app.app));
    let secret = test_app.app.settings().user_auth_token.secret.clone();

    let after_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&after_calls);
    test_app
        .app
        .hooks()
        .on_settings_after_update_request
        .bind(move |e: &mut SettingsUpdateEvent| {
            assert_eq!(e.old_settings.meta.app_name, "Keel");
            assert_eq!(e.new_settings.meta.app_name, "Renamed");
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(KeelError::internal("ignored")) })
        });

    let updated = service
        .update_settings(json!({"meta": {"appName": "Renamed"}}))
        .await
        .unwrap();

    assert_eq!(updated.meta.app_name, "Renamed");
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);
    assert_eq!(test_app.app.settings().meta.app_name, "Renamed");
    assert_eq!(test_app.app.settings().user_auth_token.secret, secret);

    let stored = test_app.app.dao().unwrap().find_settings().await.unwrap().unwrap();
    assert_eq!(stored.meta.app_name, "Renamed");
}

#[tokio::test]
async fn test_before_update_hook_error_aborts() {
    let test_app = TestApp::bootstrapped().await;
    test_app
        .app
        .hooks()
        .on_settings_before_update_request
        .bind(|_e: &mut SettingsUpdateEvent| Box::pin(async { Err(KeelError::validation("locked")) }));

    let result = SettingsService::new(Arc::clone(&test_app.app))
        .update_settings(json!({"meta": {"appName": "Renamed"}}))
        .await;

    assert!(matches!(result, Err(KeelError::Validation(_))));
    assert_eq!(test_app.app.settings().meta.app_name, "Keel");
}

#[tokio::test]
async fn test_update_settings_validates_result() {
    let test_app = TestApp::bootstrapped().await;

    let result = SettingsService::new(Arc::clone(&test_app.app))
        .update_settings(json!({"userAuthToken": {"secret": "short"}}))
        .await;

    assert!(matches!(result, Err(KeelError::Validation(_))));
}

#[tokio::test]
async fn test_api_error_renders_response() {
    let test_app = TestApp::bootstrapped().await;
    let service = ErrorService::new(Arc::clone(&test_app.app));

    let rendered = service
        .handle_api_error(&KeelError::not_found("user", "abc"))
        .await
        .unwrap();

    assert_eq!(rendered.code, "NOT_FOUND");
    assert!(rendered.message.contains("abc"));
}

#[tokio::test]
async fn test_api_error_masks_server_errors() {
    let test_app = TestApp::bootstrapped().await;
    let service = ErrorService::new(Arc::clone(&test_app.app));

    let rendered = service
        .handle_api_error(&KeelError::internal("secret detail"))
        .await
        .unwrap();

    assert!(!rendered.message.contains("secret detail"));
}

#[tokio::test]
async fn test_api_error_hooks() {
    let test_app = TestApp::bootstrapped().await;
    let hooks = test_app.app.hooks();
    hooks.on_before_api_error.bind(|e: &mut ApiErrorEvent| {
        e.response.message = "custom".to_string();
        Box::pin(async { Ok(()) })
    });

    let after_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&after_calls);
    hooks.on_after_api_error.bind(move |e: &mut ApiErrorEvent| {
        assert_eq!(e.status, 400);
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    });

    let rendered = ErrorService::new(Arc::clone(&test_app.app))
        .handle_api_error(&KeelError::validation("bad"))
        .await
        .unwrap();

    assert_eq!(rendered.message, "custom");
    assert_eq!(after_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_api_error_stop_propagation_skips_rendering() {
    let test_app = TestApp::bootstrapped().await;
    test_app
        .app
        .hooks()
        .on_before_api_error
        .bind(|_e: &mut ApiErrorEvent| Box::pin(async { Err(KeelError::StopPropagation) }));

    let rendered = ErrorService::new(Arc::clone(&test_app.app))
        .handle_api_error(&KeelError::validation("bad"))
        .await;

    assert!(rendered.is_none());
}
