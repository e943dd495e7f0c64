//! Unified client error handling with Sentry integration.
//!
//! Every storefront operation returns `Result<T, ClientError>`. Variants map
//! one-to-one onto how the failure is presented: locally resolved rejections
//! (`AuthRequired`, `DuplicateItem`, `Validation`) become warnings, everything
//! the backend or network produced becomes an error.

use reqwest::StatusCode;
use thiserror::Error;

use crate::notify::Level;
use crate::session::SessionStoreError;

/// Message shown for cart fetch failures without a usable backend message.
pub const CART_FETCH_FAILED: &str = "Could not fetch cart details. Check that the backend is running, reachable and returns valid JSON.";

/// Message shown for catalog and other request failures without a usable
/// backend message.
pub const BACKEND_UNREACHABLE: &str = "Something went wrong. Check that the backend is running, reachable and returns valid JSON.";

/// Client-level error type for the storefront.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No session token is held; the request was never sent.
    #[error("Login to add an item to the Cart")]
    AuthRequired,

    /// Non-update add of a product that is already in the cart; the request
    /// was never sent.
    #[error("Item already in cart. Use the cart sidebar to update quantity or remove item")]
    DuplicateItem,

    /// Backend rejected the session token (HTTP 401).
    #[error("{0}")]
    Unauthorized(String),

    /// Backend reported the referenced resource does not exist (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// Backend answered with any other non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend {
        /// HTTP status returned.
        status: StatusCode,
        /// Message from the `{success: false, message}` body, if any.
        message: String,
    },

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Form input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// Persisted session storage failed.
    #[error("Session storage error: {0}")]
    Session(#[from] SessionStoreError),
}

impl ClientError {
    /// Severity this error is presented with.
    #[must_use]
    pub const fn level(&self) -> Level {
        match self {
            Self::AuthRequired | Self::DuplicateItem | Self::Validation(_) => Level::Warning,
            _ => Level::Error,
        }
    }

    /// Whether the failure happened locally, without any network call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired | Self::DuplicateItem | Self::Validation(_) | Self::Session(_)
        )
    }

    /// Text shown to the user, falling back to `fallback` for transport and
    /// server failures whose raw detail is not meant for display.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Backend { message, status }
                if !message.is_empty() && status.is_client_error() =>
            {
                message.clone()
            }
            Self::Unauthorized(message) | Self::NotFound(message) if message.is_empty() => {
                fallback.to_string()
            }
            Self::Backend { .. } | Self::Http(_) | Self::Parse(_) => fallback.to_string(),
            other => other.to_string(),
        }
    }

    /// Report unexpected failures to Sentry.
    ///
    /// Local rejections and expected backend refusals are not reported.
    pub fn capture(&self) {
        if matches!(self, Self::Backend { .. } | Self::Http(_) | Self::Parse(_)) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront request failed"
            );
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Set the Sentry user context from a username.
///
/// Call this after successful login to associate errors with users.
pub fn set_sentry_user(username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_rejections_are_warnings() {
        assert_eq!(ClientError::AuthRequired.level(), Level::Warning);
        assert_eq!(ClientError::DuplicateItem.level(), Level::Warning);
        assert!(ClientError::AuthRequired.is_local());
        assert!(ClientError::DuplicateItem.is_local());
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            ClientError::AuthRequired.to_string(),
            "Login to add an item to the Cart"
        );
        assert!(
            ClientError::DuplicateItem
                .to_string()
                .starts_with("Item already in cart")
        );
    }

    #[test]
    fn test_server_errors_use_fallback_message() {
        let err = ClientError::Backend {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "stack trace here".to_string(),
        };
        assert_eq!(err.level(), Level::Error);
        assert_eq!(err.user_message(BACKEND_UNREACHABLE), BACKEND_UNREACHABLE);
    }

    #[test]
    fn test_client_errors_use_backend_message() {
        let err = ClientError::Backend {
            status: StatusCode::BAD_REQUEST,
            message: "Username is already taken".to_string(),
        };
        assert_eq!(
            err.user_message(BACKEND_UNREACHABLE),
            "Username is already taken"
        );
    }

    #[test]
    fn test_unauthorized_uses_backend_message() {
        let err = ClientError::Unauthorized("Protected route, Oauth2 Bearer token not found".into());
        assert_eq!(
            err.user_message(CART_FETCH_FAILED),
            "Protected route, Oauth2 Bearer token not found"
        );
    }
}
