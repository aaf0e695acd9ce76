//! Login, token revocation and password reset tests.

mod common;

use common::TestApp;
use keel_app::{
    new_user_auth_token, PasswordResetConfirm, PasswordResetRequest, UserAuthEvent, UserLogin,
};
use keel_core::{KeelError, Model};

fn login_form(email: &str, password: &str) -> UserLogin {
    UserLogin {
        email: email.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn test_login_returns_token_for_user() {
    let test_app = TestApp::bootstrapped().await;
    let user = test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();

    let response = auth
        .login(&login_form("test@example.com", "password123"))
        .await
        .unwrap()
        .expect("default response");

    assert_eq!(response.user.id(), user.id());
    let resolved = auth
        .find_user_by_bearer(&format!("Bearer {}", response.token))
        .await
        .unwrap();
    assert_eq!(resolved.id(), user.id());
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let test_app = TestApp::bootstrapped().await;
    test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();

    let wrong_password = auth.login(&login_form("test@example.com", "wrong")).await;
    let unknown_email = auth.login(&login_form("missing@example.com", "password123")).await;

    assert!(matches!(wrong_password, Err(KeelError::InvalidCredentials)));
    assert!(matches!(unknown_email, Err(KeelError::InvalidCredentials)));
}

#[tokio::test]
async fn test_login_rejects_invalid_form() {
    let test_app = TestApp::bootstrapped().await;

    let result = test_app.auth().login(&login_form("not-an-email", "")).await;

    assert!(matches!(result, Err(KeelError::Validation(_))));
}

#[tokio::test]
async fn test_auth_hook_can_replace_response() {
    let test_app = TestApp::bootstrapped().await;
    test_app.create_user("test@example.com", "password123").await;
    test_app
        .app
        .hooks()
        .on_user_auth_request
        .bind(|_e: &mut UserAuthEvent| Box::pin(async { Err(KeelError::StopPropagation) }));

    let response = test_app
        .auth()
        .login(&login_form("test@example.com", "password123"))
        .await
        .unwrap();

    assert!(response.is_none());
}

#[tokio::test]
async fn test_auth_hook_error_fails_login() {
    let test_app = TestApp::bootstrapped().await;
    test_app.create_user("test@example.com", "password123").await;
    test_app
        .app
        .hooks()
        .on_user_auth_request
        .bind(|_e: &mut UserAuthEvent| Box::pin(async { Err(KeelError::unauthorized("suspended")) }));

    let result = test_app
        .auth()
        .login(&login_form("test@example.com", "password123"))
        .await;

    assert!(matches!(result, Err(KeelError::Unauthorized(_))));
}

#[tokio::test]
async fn test_logout_revokes_issued_tokens() {
    let test_app = TestApp::bootstrapped().await;
    let mut user = test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();
    let token = new_user_auth_token(&user, &test_app.app.settings()).unwrap();

    auth.logout(&mut user).await.unwrap();

    assert!(auth.find_user_by_bearer(&token).await.is_err());
}

#[tokio::test]
async fn test_refresh_auth_issues_new_token_and_revokes_old() {
    let test_app = TestApp::bootstrapped().await;
    let mut user = test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();
    let old_token = new_user_auth_token(&user, &test_app.app.settings()).unwrap();

    let response = auth.refresh_auth(&mut user).await.unwrap().unwrap();

    assert_ne!(response.token, old_token);
    assert!(auth.find_user_by_bearer(&old_token).await.is_err());
    assert_eq!(
        auth.find_user_by_bearer(&response.token).await.unwrap().id(),
        user.id()
    );
}

#[tokio::test]
async fn test_bearer_header_must_carry_a_token() {
    let test_app = TestApp::bootstrapped().await;
    let auth = test_app.auth();

    assert!(matches!(
        auth.find_user_by_bearer("Bearer ").await,
        Err(KeelError::Unauthorized(_))
    ));
    assert!(auth.find_user_by_bearer("Bearer garbage").await.is_err());
}

#[tokio::test]
async fn test_password_reset_flow() {
    let test_app = TestApp::bootstrapped().await;
    test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();

    let token = auth
        .request_password_reset(&PasswordResetRequest {
            email: "test@example.com".to_string(),
        })
        .await
        .unwrap();

    let confirm = PasswordResetConfirm {
        token,
        password: "new-password".to_string(),
        password_confirm: "new-password".to_string(),
    };
    let user = auth.confirm_password_reset(&confirm).await.unwrap();
    assert!(user.last_reset_sent_at.is_none());

    assert!(auth.login(&login_form("test@example.com", "new-password")).await.is_ok());
    assert!(matches!(
        auth.login(&login_form("test@example.com", "password123")).await,
        Err(KeelError::InvalidCredentials)
    ));

    // the reset token is single use
    assert!(auth.confirm_password_reset(&confirm).await.is_err());
}

#[tokio::test]
async fn test_password_reset_requests_are_throttled() {
    let test_app = TestApp::bootstrapped().await;
    test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();
    let form = PasswordResetRequest {
        email: "test@example.com".to_string(),
    };

    auth.request_password_reset(&form).await.unwrap();
    let second = auth.request_password_reset(&form).await;

    assert!(matches!(second, Err(KeelError::Validation(_))));
}

#[tokio::test]
async fn test_password_reset_for_unknown_email() {
    let test_app = TestApp::bootstrapped().await;

    let result = test_app
        .auth()
        .request_password_reset(&PasswordResetRequest {
            email: "missing@example.com".to_string(),
        })
        .await;

    assert!(matches!(result, Err(KeelError::NotFound { .. })));
}

#[tokio::test]
async fn test_reset_token_is_not_an_auth_token() {
    let test_app = TestApp::bootstrapped().await;
    test_app.create_user("test@example.com", "password123").await;
    let auth = test_app.auth();

    let token = auth
        .request_password_reset(&PasswordResetRequest {
            email: "test@example.com".to_string(),
        })
        .await
        .unwrap();

    assert!(auth.find_user_by_bearer(&token).await.is_err());
}
