//! Integration tests for the QKart storefront client.
//!
//! Tests drive a real [`Storefront`] against [`MockBackend`], an in-process
//! axum server speaking the QKart REST API on an ephemeral port. The backend
//! records every request so tests can assert what was (and was not) sent.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p qkart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - catalog fetch, search and stale-response handling
//! - `cart` - cart fetch, add-to-cart state machine, reconciliation
//! - `session` - login, registration, logout and persisted sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use url::Url;

use qkart_storefront::Storefront;
use qkart_storefront::config::StorefrontConfig;
use qkart_storefront::notify::Notification;
use qkart_storefront::session::{MemorySessionStore, SessionStore, StoredSession};

/// Token the mock backend issues and accepts.
pub const TEST_TOKEN: &str = "test-token";
/// Account known to the mock backend.
pub const TEST_USER: &str = "shopper";
pub const TEST_PASSWORD: &str = "s3cret-pw";

const UNAUTHORIZED_MESSAGE: &str = "Protected route, Oauth2 Bearer token not found";

// =============================================================================
// Fixtures
// =============================================================================

/// A product as the backend serializes it.
#[must_use]
pub fn product(id: &str, name: &str, category: &str, cost: u32, rating: u8) -> Value {
    json!({
        "_id": id,
        "name": name,
        "category": category,
        "cost": cost,
        "rating": rating,
        "image": format!("https://images.example.com/{id}.png"),
    })
}

/// A cart entry as the backend serializes it.
#[must_use]
pub fn cart_entry(product_id: &str, qty: u32) -> Value {
    json!({ "productId": product_id, "qty": qty })
}

/// Catalog served unless a test replaces it.
#[must_use]
pub fn default_products() -> Vec<Value> {
    vec![
        product("p1", "Tan Leatherette Weekender Duffle", "Fashion", 150, 4),
        product("p2", "The Minimalist Slim Leather Watch", "Electronics", 60, 5),
        product("p3", "Atomberg 1200mm Ceiling Fan", "Home & Kitchen", 80, 3),
        product("p4", "Stylish Phone Stand", "Electronics", 25, 4),
    ]
}

/// Session the mock backend accepts.
#[must_use]
pub fn stored_session() -> StoredSession {
    StoredSession {
        token: TEST_TOKEN.to_string(),
        username: TEST_USER.to_string(),
        balance: Some(5000),
        logged_in_at: Utc::now(),
    }
}

// =============================================================================
// Mock Backend
// =============================================================================

/// Endpoints of the mock backend, used to script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Products,
    Search,
    GetCart,
    UpdateCart,
    Login,
    Register,
}

/// A request as received by the mock backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    /// Path below the API base, e.g. `/cart`.
    pub path: &'static str,
    /// `value` query parameter of search requests.
    pub search_term: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
struct MockState {
    products: Vec<Value>,
    cart: Vec<Value>,
    users: HashMap<String, String>,
    requests: Vec<RecordedRequest>,
    failures: HashMap<Route, (StatusCode, String)>,
    search_delays: HashMap<String, Duration>,
}

impl MockState {
    fn with_fixtures() -> Self {
        Self {
            products: default_products(),
            users: HashMap::from([(TEST_USER.to_string(), TEST_PASSWORD.to_string())]),
            ..Self::default()
        }
    }

    fn failure(&self, route: Route) -> Option<Response> {
        self.failures
            .get(&route)
            .map(|(status, message)| error(*status, message))
    }

    fn has_product(&self, id: &str) -> bool {
        self.products.iter().any(|p| p["_id"] == id)
    }
}

type SharedState = Arc<Mutex<MockState>>;

/// In-process QKart backend.
///
/// The server task is aborted when the backend is dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: SharedState,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Start serving on `127.0.0.1` with the default catalog, an empty cart
    /// and one registered user.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(MockState::with_fixtures()));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// API base URL, as `QKART_API_ENDPOINT` would be configured.
    #[must_use]
    pub fn endpoint(&self) -> Url {
        Url::parse(&format!("http://{}/api/v1/", self.addr))
            .expect("socket address forms a valid URL")
    }

    /// Client configuration pointing at this backend.
    #[must_use]
    pub fn config(&self, session_file: impl Into<PathBuf>) -> StorefrontConfig {
        StorefrontConfig::with_endpoint(self.endpoint(), session_file.into())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    pub fn set_products(&self, products: Vec<Value>) {
        self.lock().products = products;
    }

    pub fn set_cart(&self, cart: Vec<Value>) {
        self.lock().cart = cart;
    }

    /// Cart as currently held by the backend.
    #[must_use]
    pub fn cart(&self) -> Vec<Value> {
        self.lock().cart.clone()
    }

    /// Answer every request to `route` with `status` and `message`.
    pub fn fail(&self, route: Route, status: StatusCode, message: &str) {
        self.lock()
            .failures
            .insert(route, (status, message.to_string()));
    }

    /// Hold back the response to searches for `term`.
    pub fn delay_search(&self, term: &str, delay: Duration) {
        self.lock().search_delays.insert(term.to_string(), delay);
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests received for `method` and `path`.
    #[must_use]
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .cloned()
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn router(state: SharedState) -> Router {
    let api = Router::new()
        .route("/products", get(list_products))
        .route("/products/search", get(search_products))
        .route("/cart", get(get_cart).post(update_cart))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register));

    Router::new().nest("/api/v1", api).with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn is_authorized(authorization: Option<&str>) -> bool {
    authorization.and_then(|v| v.strip_prefix("Bearer ")) == Some(TEST_TOKEN)
}

async fn list_products(State(state): State<SharedState>) -> Response {
    let mut state = lock(&state);
    state.requests.push(RecordedRequest {
        method: "GET",
        path: "/products",
        search_term: None,
        authorization: None,
        body: None,
    });

    if let Some(response) = state.failure(Route::Products) {
        return response;
    }
    Json(state.products.clone()).into_response()
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    value: String,
}

async fn search_products(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let (delay, response) = {
        let mut state = lock(&state);
        state.requests.push(RecordedRequest {
            method: "GET",
            path: "/products/search",
            search_term: Some(params.value.clone()),
            authorization: None,
            body: None,
        });

        let delay = state.search_delays.get(&params.value).copied();
        let response = state.failure(Route::Search).unwrap_or_else(|| {
            let term = params.value.to_lowercase();
            let matches: Vec<Value> = state
                .products
                .iter()
                .filter(|p| {
                    ["name", "category"].iter().any(|field| {
                        p[*field]
                            .as_str()
                            .is_some_and(|s| s.to_lowercase().contains(&term))
                    })
                })
                .cloned()
                .collect();

            if matches.is_empty() {
                error(StatusCode::NOT_FOUND, "No products found")
            } else {
                Json(matches).into_response()
            }
        });
        (delay, response)
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

async fn get_cart(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let authorization = authorization(&headers);
    let mut state = lock(&state);
    state.requests.push(RecordedRequest {
        method: "GET",
        path: "/cart",
        search_term: None,
        authorization: authorization.clone(),
        body: None,
    });

    if !is_authorized(authorization.as_deref()) {
        return error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE);
    }
    if let Some(response) = state.failure(Route::GetCart) {
        return response;
    }
    Json(state.cart.clone()).into_response()
}

#[derive(Deserialize)]
struct CartUpdate {
    #[serde(rename = "productId")]
    product_id: String,
    qty: u32,
}

async fn update_cart(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let authorization = authorization(&headers);
    let mut state = lock(&state);
    state.requests.push(RecordedRequest {
        method: "POST",
        path: "/cart",
        search_term: None,
        authorization: authorization.clone(),
        body: Some(body.clone()),
    });

    if !is_authorized(authorization.as_deref()) {
        return error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE);
    }
    if let Some(response) = state.failure(Route::UpdateCart) {
        return response;
    }
    let Ok(update) = serde_json::from_value::<CartUpdate>(body) else {
        return error(StatusCode::BAD_REQUEST, "\"productId\" is required");
    };
    if !state.has_product(&update.product_id) {
        return error(StatusCode::NOT_FOUND, "Product doesn't exist");
    }

    let position = state
        .cart
        .iter()
        .position(|e| e["productId"] == update.product_id.as_str());
    match (position, update.qty) {
        (Some(i), 0) => {
            state.cart.remove(i);
        }
        (Some(i), qty) => state.cart[i] = cart_entry(&update.product_id, qty),
        (None, 0) => {}
        (None, qty) => state.cart.push(cart_entry(&update.product_id, qty)),
    }
    Json(state.cart.clone()).into_response()
}

#[derive(Deserialize)]
struct Credentials {
    username: String,
    password: String,
}

fn record_credentials(state: &mut MockState, path: &'static str, body: &Value) {
    let mut redacted = body.clone();
    if let Some(password) = redacted.get_mut("password") {
        *password = json!("[REDACTED]");
    }
    state.requests.push(RecordedRequest {
        method: "POST",
        path,
        search_term: None,
        authorization: None,
        body: Some(redacted),
    });
}

async fn login(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    record_credentials(&mut state, "/auth/login", &body);

    if let Some(response) = state.failure(Route::Login) {
        return response;
    }
    let Ok(credentials) = serde_json::from_value::<Credentials>(body) else {
        return error(StatusCode::BAD_REQUEST, "\"username\" is required");
    };
    match state.users.get(&credentials.username) {
        None => error(StatusCode::BAD_REQUEST, "Username does not exist"),
        Some(password) if *password != credentials.password => {
            error(StatusCode::BAD_REQUEST, "Password is incorrect")
        }
        Some(_) => Json(json!({
            "success": true,
            "token": TEST_TOKEN,
            "username": credentials.username,
            "balance": 5000,
        }))
        .into_response(),
    }
}

async fn register(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let mut state = lock(&state);
    record_credentials(&mut state, "/auth/register", &body);

    if let Some(response) = state.failure(Route::Register) {
        return response;
    }
    let Ok(credentials) = serde_json::from_value::<Credentials>(body) else {
        return error(StatusCode::BAD_REQUEST, "\"username\" is required");
    };
    if state.users.contains_key(&credentials.username) {
        return error(StatusCode::BAD_REQUEST, "Username is already taken");
    }
    state
        .users
        .insert(credentials.username, credentials.password);
    (StatusCode::CREATED, Json(json!({ "success": true }))).into_response()
}

// =============================================================================
// Storefront Harness
// =============================================================================

/// A storefront wired to a fresh mock backend, collecting notifications.
pub struct TestStorefront {
    pub backend: MockBackend,
    pub storefront: Storefront,
    notifications: mpsc::UnboundedReceiver<Notification>,
    _session_dir: TempDir,
}

impl TestStorefront {
    /// Logged-out storefront.
    pub async fn anonymous() -> Self {
        Self::with_store(Arc::new(MemorySessionStore::new())).await
    }

    /// Storefront holding a session the backend accepts.
    pub async fn logged_in() -> Self {
        Self::with_store(Arc::new(MemorySessionStore::with_session(stored_session()))).await
    }

    /// Storefront backed by `store`.
    pub async fn with_store(store: Arc<dyn SessionStore>) -> Self {
        let backend = MockBackend::start().await.expect("mock backend starts");
        let session_dir = TempDir::new().expect("temp dir is created");
        let config = backend.config(session_dir.path().join("session.json"));
        let (notifier, notifications) = mpsc::unbounded_channel();
        let storefront =
            Storefront::new(config, store, Arc::new(notifier)).expect("storefront builds");

        Self {
            backend,
            storefront,
            notifications,
            _session_dir: session_dir,
        }
    }

    /// Notifications emitted since the last call.
    pub fn notifications(&mut self) -> Vec<Notification> {
        let mut drained = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            drained.push(notification);
        }
        drained
    }
}

impl std::fmt::Debug for TestStorefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestStorefront")
            .field("backend", &self.backend)
            .field("storefront", &self.storefront)
            .finish_non_exhaustive()
    }
}
