//! Login and registration.
//!
//! Form input is validated locally before anything is sent, mirroring the
//! rules the backend enforces. A successful login persists the issued token
//! through the [`SessionGate`].

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use qkart_core::{Username, UsernameError};

use crate::api::StorefrontClient;
use crate::error::{ClientError, Result};
use crate::session::{Session, SessionGate, StoredSession};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Check login form input.
///
/// # Errors
///
/// Returns `Validation` if either field is empty.
pub fn validate_login(username: &str, password: &SecretString) -> Result<()> {
    if username.trim().is_empty() {
        return Err(ClientError::Validation(UsernameError::Empty.to_string()));
    }
    if password.expose_secret().is_empty() {
        return Err(ClientError::Validation(
            "Password is a required field".to_string(),
        ));
    }
    Ok(())
}

/// Check registration form input.
///
/// # Errors
///
/// Returns `Validation` if the username is invalid, the password is empty or
/// shorter than [`MIN_PASSWORD_LENGTH`], or the confirmation differs.
pub fn validate_registration(
    username: &str,
    password: &SecretString,
    confirm: &SecretString,
) -> Result<Username> {
    let username = Username::parse(username).map_err(|e| ClientError::Validation(e.to_string()))?;

    let password = password.expose_secret();
    if password.is_empty() {
        return Err(ClientError::Validation(
            "Password is a required field".to_string(),
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ClientError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirm.expose_secret() {
        return Err(ClientError::Validation("Passwords do not match".to_string()));
    }

    Ok(username)
}

/// Authentication flows over the REST API.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: StorefrontClient,
    gate: SessionGate,
}

impl AuthService {
    #[must_use]
    pub const fn new(client: StorefrontClient, gate: SessionGate) -> Self {
        Self { client, gate }
    }

    /// Log in and persist the issued session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for empty fields, the backend's rejection for bad
    /// credentials, or `Session` if the token cannot be stored.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<Session> {
        validate_login(username, password)?;

        let response = self
            .client
            .login(username.trim(), password.expose_secret())
            .await?;

        let stored = StoredSession {
            token: response.token,
            username: response.username,
            balance: response.balance,
            logged_in_at: Utc::now(),
        };
        let session = self.gate.login(&stored)?;
        info!(username = %stored.username, "Logged in");
        Ok(session)
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for rejected input, or the backend's rejection
    /// (e.g. the username is taken).
    #[instrument(skip(self, password, confirm))]
    pub async fn register(
        &self,
        username: &str,
        password: &SecretString,
        confirm: &SecretString,
    ) -> Result<Username> {
        let username = validate_registration(username, password, confirm)?;
        self.client
            .register(username.as_str(), password.expose_secret())
            .await?;
        info!(username = %username, "Registered");
        Ok(username)
    }
}
