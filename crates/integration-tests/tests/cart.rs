//! Cart fetching, the add-to-cart flow and reconciliation against the mock
//! backend.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use qkart_core::ProductId;
use qkart_integration_tests::{Route, TEST_TOKEN, TestStorefront, cart_entry, stored_session};
use qkart_storefront::ClientError;
use qkart_storefront::cart::{self, AddMode};
use qkart_storefront::error::CART_FETCH_FAILED;
use qkart_storefront::notify::Notification;
use qkart_storefront::session::{MemorySessionStore, StoredSession};

fn entry_ids(t: &TestStorefront) -> Vec<String> {
    t.storefront
        .cart()
        .entries()
        .iter()
        .map(|e| e.product_id.as_str().to_owned())
        .collect()
}

#[tokio::test]
async fn test_load_fetches_cart_with_bearer_token() {
    let mut t = TestStorefront::logged_in().await;
    t.backend.set_cart(vec![cart_entry("p2", 2)]);

    t.storefront.load().await;

    let fetches = t.backend.requests_to("GET", "/cart");
    assert_eq!(fetches.len(), 1);
    assert_eq!(
        fetches[0].authorization.as_deref(),
        Some(format!("Bearer {TEST_TOKEN}").as_str())
    );
    assert_eq!(entry_ids(&t), ["p2"]);
    assert!(t.notifications().is_empty());
}

#[tokio::test]
async fn test_add_posts_entry_and_adopts_backend_cart() {
    let mut t = TestStorefront::logged_in().await;
    t.storefront.load().await;

    let entries = t
        .storefront
        .add_to_cart(&ProductId::new("p1"), 1, AddMode::Insert)
        .await
        .unwrap();

    let posts = t.backend.requests_to("POST", "/cart");
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].body, Some(json!({ "productId": "p1", "qty": 1 })));
    assert_eq!(entries.len(), 1);
    assert_eq!(entry_ids(&t), ["p1"]);
    // Success is silent.
    assert!(t.notifications().is_empty());
}

#[tokio::test]
async fn test_duplicate_add_sends_nothing_and_warns() {
    let mut t = TestStorefront::logged_in().await;
    t.backend.set_cart(vec![cart_entry("p1", 1)]);
    t.storefront.load().await;

    let result = t
        .storefront
        .add_to_cart(&ProductId::new("p1"), 1, AddMode::Insert)
        .await;

    assert!(matches!(result, Err(ClientError::DuplicateItem)));
    assert!(t.backend.requests_to("POST", "/cart").is_empty());
    assert_eq!(
        t.notifications(),
        [Notification::warning(
            "Item already in cart. Use the cart sidebar to update quantity or remove item"
        )]
    );
    assert_eq!(t.backend.cart(), [cart_entry("p1", 1)]);
}

#[tokio::test]
async fn test_anonymous_add_sends_nothing_and_warns() {
    let mut t = TestStorefront::anonymous().await;
    t.storefront.load().await;

    let result = t
        .storefront
        .add_to_cart(&ProductId::new("p1"), 1, AddMode::Insert)
        .await;

    assert!(matches!(result, Err(ClientError::AuthRequired)));
    assert!(t.backend.requests_to("POST", "/cart").is_empty());
    assert_eq!(
        t.notifications(),
        [Notification::warning("Login to add an item to the Cart")]
    );
}

#[tokio::test]
async fn test_update_sets_quantity_and_zero_removes() {
    let t = TestStorefront::logged_in().await;
    t.backend
        .set_cart(vec![cart_entry("p1", 1), cart_entry("p2", 2)]);
    t.storefront.load().await;

    t.storefront
        .add_to_cart(&ProductId::new("p1"), 3, AddMode::Update)
        .await
        .unwrap();
    assert_eq!(
        t.backend.cart(),
        [cart_entry("p1", 3), cart_entry("p2", 2)]
    );

    let entries = t
        .storefront
        .add_to_cart(&ProductId::new("p2"), 0, AddMode::Update)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entry_ids(&t), ["p1"]);
    assert_eq!(t.storefront.cart().entries()[0].quantity.get(), 3);
}

#[tokio::test]
async fn test_unknown_product_shows_backend_message() {
    let mut t = TestStorefront::logged_in().await;
    t.storefront.load().await;

    let result = t
        .storefront
        .add_to_cart(&ProductId::new("missing"), 1, AddMode::Insert)
        .await;

    assert!(matches!(result, Err(ClientError::NotFound(_))));
    assert_eq!(
        t.notifications(),
        [Notification::error("Product doesn't exist")]
    );
    assert!(t.storefront.cart().entries().is_empty());
}

#[tokio::test]
async fn test_rejected_token_falls_back_to_empty_cart() {
    let expired = StoredSession {
        token: "expired-token".to_string(),
        ..stored_session()
    };
    let mut t = TestStorefront::with_store(Arc::new(MemorySessionStore::with_session(expired))).await;
    t.backend.set_cart(vec![cart_entry("p1", 1)]);

    t.storefront.load().await;

    assert!(t.storefront.cart().entries().is_empty());
    assert_eq!(
        t.notifications(),
        [Notification::error(
            "Protected route, Oauth2 Bearer token not found"
        )]
    );
    // The catalog still loads.
    assert_eq!(t.storefront.catalog().products().len(), 4);
}

#[tokio::test]
async fn test_cart_server_error_uses_fallback_message() {
    let mut t = TestStorefront::logged_in().await;
    t.backend
        .fail(Route::GetCart, StatusCode::INTERNAL_SERVER_ERROR, "db down");

    let result = t.storefront.cart().fetch(&t.storefront.session()).await;

    assert!(result.is_err());
    assert!(t.storefront.cart().entries().is_empty());
    assert_eq!(t.notifications(), [Notification::error(CART_FETCH_FAILED)]);
}

#[tokio::test]
async fn test_line_items_follow_cart_order_and_skip_unknown_products() {
    let t = TestStorefront::logged_in().await;
    t.backend.set_cart(vec![
        cart_entry("p3", 1),
        cart_entry("discontinued", 5),
        cart_entry("p1", 2),
    ]);
    t.storefront.load().await;

    let items = t.storefront.line_items();
    let ids: Vec<_> = items.iter().map(|i| i.product.id.as_str()).collect();
    assert_eq!(ids, ["p3", "p1"]);
    assert_eq!(cart::item_count(&items), 3);
    // 80 * 1 + 150 * 2
    assert_eq!(t.storefront.cart_total().to_string(), "$380");
}

#[tokio::test]
async fn test_logout_clears_cart_and_catalog() {
    let t = TestStorefront::logged_in().await;
    t.backend.set_cart(vec![cart_entry("p1", 1)]);
    t.storefront.load().await;
    assert!(!t.storefront.line_items().is_empty());

    t.storefront.logout().unwrap();

    assert!(!t.storefront.is_authenticated());
    assert!(t.storefront.cart().entries().is_empty());
    assert!(t.storefront.catalog().products().is_empty());
}
