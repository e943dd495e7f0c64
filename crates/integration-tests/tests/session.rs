//! Login, registration and logout against the mock backend, with the session
//! persisted to disk.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use secrecy::SecretString;

use qkart_core::ProductId;
use qkart_integration_tests::{TEST_PASSWORD, TEST_USER, TestStorefront, cart_entry};
use qkart_storefront::ClientError;
use qkart_storefront::cart::AddMode;
use qkart_storefront::session::{FileSessionStore, NavAction, SessionStore};

fn secret(s: &str) -> SecretString {
    SecretString::from(s)
}

#[tokio::test]
async fn test_login_persists_session_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qkart").join("session.json");
    let t = TestStorefront::with_store(Arc::new(FileSessionStore::new(&path))).await;
    assert!(!t.storefront.is_authenticated());

    let session = t
        .storefront
        .auth()
        .login(TEST_USER, &secret(TEST_PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.username(), Some(TEST_USER));
    assert!(t.storefront.is_authenticated());

    let stored = FileSessionStore::new(&path).load().unwrap().unwrap();
    assert_eq!(stored.username, TEST_USER);
    assert_eq!(stored.balance, Some(5000));

    let nav = t.storefront.navigation(false);
    assert_eq!(nav.username.as_deref(), Some(TEST_USER));
    assert_eq!(nav.actions, [NavAction::Logout]);

    // The password never reaches the request log in clear text.
    let logins = t.backend.requests_to("POST", "/auth/login");
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].body.as_ref().unwrap()["username"], TEST_USER);
    assert_ne!(logins[0].body.as_ref().unwrap()["password"], TEST_PASSWORD);
}

#[tokio::test]
async fn test_logged_in_session_enables_cart() {
    let t = TestStorefront::anonymous().await;
    t.backend.set_cart(vec![cart_entry("p2", 1)]);

    t.storefront
        .auth()
        .login(TEST_USER, &secret(TEST_PASSWORD))
        .await
        .unwrap();
    t.storefront.load().await;
    t.storefront
        .add_to_cart(&ProductId::new("p3"), 1, AddMode::Insert)
        .await
        .unwrap();

    let ids: Vec<_> = t
        .storefront
        .line_items()
        .iter()
        .map(|i| i.product.id.as_str().to_owned())
        .collect();
    assert_eq!(ids, ["p2", "p3"]);
}

#[tokio::test]
async fn test_logout_removes_session_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let t = TestStorefront::with_store(Arc::new(FileSessionStore::new(&path))).await;
    t.storefront
        .auth()
        .login(TEST_USER, &secret(TEST_PASSWORD))
        .await
        .unwrap();
    assert!(path.exists());

    t.storefront.logout().unwrap();

    assert!(!path.exists());
    assert!(!t.storefront.is_authenticated());
    assert_eq!(
        t.storefront.navigation(false).actions,
        [NavAction::Login, NavAction::Register]
    );
}

#[tokio::test]
async fn test_wrong_password_shows_backend_message() {
    let t = TestStorefront::anonymous().await;

    let err = t
        .storefront
        .auth()
        .login(TEST_USER, &secret("not-the-password"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Backend { .. }));
    assert_eq!(err.user_message("fallback"), "Password is incorrect");
    assert!(!t.storefront.is_authenticated());
}

#[tokio::test]
async fn test_empty_login_fields_are_rejected_locally() {
    let t = TestStorefront::anonymous().await;

    let err = t
        .storefront
        .auth()
        .login("  ", &secret(TEST_PASSWORD))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Username is a required field");
    assert!(t.backend.requests().is_empty());
}

#[tokio::test]
async fn test_register_then_login() {
    let t = TestStorefront::anonymous().await;

    let username = t
        .storefront
        .auth()
        .register("newshopper", &secret("hunter22"), &secret("hunter22"))
        .await
        .unwrap();
    assert_eq!(username.as_str(), "newshopper");
    // Registration does not log in.
    assert!(!t.storefront.is_authenticated());

    t.storefront
        .auth()
        .login("newshopper", &secret("hunter22"))
        .await
        .unwrap();
    assert!(t.storefront.is_authenticated());
}

#[tokio::test]
async fn test_register_taken_username_shows_backend_message() {
    let t = TestStorefront::anonymous().await;

    let err = t
        .storefront
        .auth()
        .register(TEST_USER, &secret("hunter22"), &secret("hunter22"))
        .await
        .unwrap_err();

    assert_eq!(err.user_message("fallback"), "Username is already taken");
}

#[tokio::test]
async fn test_register_mismatched_passwords_sends_nothing() {
    let t = TestStorefront::anonymous().await;

    let err = t
        .storefront
        .auth()
        .register("newshopper", &secret("hunter22"), &secret("hunter23"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Passwords do not match");
    assert!(t.backend.requests_to("POST", "/auth/register").is_empty());
}
