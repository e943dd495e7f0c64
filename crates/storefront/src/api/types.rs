//! Request and response bodies of the QKart REST API.

use serde::{Deserialize, Serialize};

use qkart_core::ProductId;

/// Body of every failed response: `{"success": false, "message": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// `POST /cart` body.
///
/// A `qty` of zero asks the backend to remove the entry.
#[derive(Debug, Clone, Serialize)]
pub struct CartUpdateRequest<'a> {
    #[serde(rename = "productId")]
    pub product_id: &'a ProductId,
    pub qty: u32,
}

/// `POST /auth/login` and `POST /auth/register` body.
#[derive(Serialize)]
pub struct CredentialsRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /auth/login` success body.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub username: String,
    #[serde(default)]
    pub balance: Option<i64>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("success", &self.success)
            .field("token", &"[REDACTED]")
            .field("username", &self.username)
            .field("balance", &self.balance)
            .finish()
    }
}

/// `POST /auth/register` success body.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_update_request_wire_format() {
        let id = ProductId::new("p1");
        let body = CartUpdateRequest {
            product_id: &id,
            qty: 1,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"productId": "p1", "qty": 1})
        );
    }

    #[test]
    fn test_error_body_tolerates_missing_fields() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(!body.success);
        assert!(body.message.is_empty());
    }

    #[test]
    fn test_login_response_debug_redacts_token() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"success":true,"token":"secret-jwt","username":"shopper","balance":5000}"#,
        )
        .unwrap();
        assert_eq!(resp.balance, Some(5000));
        assert!(!format!("{resp:?}").contains("secret-jwt"));
    }
}
