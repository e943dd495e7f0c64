//! QKart REST API client.
//!
//! # Endpoints
//!
//! - `GET /products` - full catalog
//! - `GET /products/search?value=<term>` - filtered catalog (404 means no matches)
//! - `GET /cart` - the user's cart entries (bearer token)
//! - `POST /cart` - add or update an entry, returns the full cart (bearer token)
//! - `POST /auth/login`, `POST /auth/register`
//!
//! The backend is the source of truth for the cart: every mutation returns
//! the complete updated entry list and nothing is patched locally.

pub mod types;

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use qkart_core::{CartEntry, Product, ProductId};

use crate::config::StorefrontConfig;
use crate::error::{ClientError, Result};
use crate::session::{Session, bearer};

use types::{CartUpdateRequest, CredentialsRequest, ErrorBody, LoginResponse, RegisterResponse};

/// How much of an unexpected body is kept in logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the QKart REST API.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: Url,
}

impl StorefrontClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(StorefrontClientInner {
                client: builder.build()?,
                endpoint: config.api_endpoint.clone(),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.inner
            .endpoint
            .join(path)
            .map_err(|e| ClientError::Validation(format!("invalid request path {path}: {e}")))
    }

    /// Send a request and decode a JSON success body.
    async fn execute<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %truncate(&body),
                "Failed to parse backend response"
            );
            ClientError::Parse(e)
        })
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Fetch every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend answers non-2xx.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>> {
        let url = self.url("products")?;
        debug!(%url, "Fetching catalog");
        self.execute(self.inner.client.get(url)).await
    }

    /// Fetch products matching `term`.
    ///
    /// A 404 means nothing matched and is returned as an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error for transport failures and any other non-2xx status.
    #[instrument(skip(self))]
    pub async fn search_products(&self, term: &str) -> Result<Vec<Product>> {
        let mut url = self.url("products/search")?;
        url.query_pairs_mut().append_pair("value", term);
        debug!(%url, "Searching catalog");

        match self.execute(self.inner.client.get(url)).await {
            Err(ClientError::NotFound(_)) => {
                debug!("No products matched search");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Fetch the user's cart entries.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` without sending anything if `session` holds no
    /// token, `Unauthorized` if the backend rejects the token, and transport
    /// or backend errors otherwise.
    #[instrument(skip_all, fields(username = session.username()))]
    pub async fn get_cart(&self, session: &Session) -> Result<Vec<CartEntry>> {
        let token = session.token().ok_or(ClientError::AuthRequired)?;
        let url = self.url("cart")?;
        debug!("Fetching cart");

        self.execute(
            self.inner
                .client
                .get(url)
                .header(reqwest::header::AUTHORIZATION, bearer(token)),
        )
        .await
    }

    /// Set the quantity of `product_id` in the cart, returning the backend's
    /// full updated cart.
    ///
    /// # Errors
    ///
    /// Returns `AuthRequired` without sending anything if `session` holds no
    /// token, `NotFound` if the product doesn't exist, and transport or
    /// backend errors otherwise.
    #[instrument(skip(self, session), fields(product_id = %product_id))]
    pub async fn update_cart(
        &self,
        session: &Session,
        product_id: &ProductId,
        qty: u32,
    ) -> Result<Vec<CartEntry>> {
        let token = session.token().ok_or(ClientError::AuthRequired)?;
        let url = self.url("cart")?;
        debug!(qty, "Posting cart update");

        self.execute(
            self.inner
                .client
                .post(url)
                .header(reqwest::header::AUTHORIZATION, bearer(token))
                .json(&CartUpdateRequest { product_id, qty }),
        )
        .await
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns a `Backend` error carrying the backend's message for rejected
    /// credentials, and transport errors otherwise.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = self.url("auth/login")?;
        self.execute(
            self.inner
                .client
                .post(url)
                .json(&CredentialsRequest { username, password }),
        )
        .await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns a `Backend` error carrying the backend's message (e.g. the
    /// username is taken), and transport errors otherwise.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, password: &str) -> Result<RegisterResponse> {
        let url = self.url("auth/register")?;
        self.execute(
            self.inner
                .client
                .post(url)
                .json(&CredentialsRequest { username, password }),
        )
        .await
    }
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Map a non-success response onto the error taxonomy.
fn error_from_response(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        _ => {
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %truncate(body),
                    "Backend returned server error"
                );
            } else {
                tracing::warn!(status = %status, message = %message, "Backend rejected request");
            }
            ClientError::Backend { status, message }
        }
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_keeps_backend_message() {
        let err = error_from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Protected route, Oauth2 Bearer token not found"}"#,
        );
        assert!(
            matches!(err, ClientError::Unauthorized(ref m) if m == "Protected route, Oauth2 Bearer token not found")
        );
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = error_from_response(
            StatusCode::NOT_FOUND,
            r#"{"success":false,"message":"Product doesn't exist"}"#,
        );
        assert_eq!(err.to_string(), "Product doesn't exist");
    }

    #[test]
    fn test_server_error_with_non_json_body() {
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert!(matches!(
            err,
            ClientError::Backend { status, ref message }
                if status == StatusCode::INTERNAL_SERVER_ERROR && message.is_empty()
        ));
    }

    #[test]
    fn test_truncate_limits_length() {
        let long = "x".repeat(LOG_BODY_LIMIT * 2);
        assert_eq!(truncate(&long).len(), LOG_BODY_LIMIT);
    }
}
