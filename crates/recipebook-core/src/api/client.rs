//! HTTP client for the hosted identity provider.
//!
//! Wraps the two password endpoints of the Identity Toolkit REST API and
//! turns their responses into `AuthResult` values or `AuthError`s.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::AuthError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the Identity Toolkit REST API
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Registration endpoint
const SIGN_UP_ENDPOINT: &str = "accounts:signUp";

/// Password sign-in endpoint
const SIGN_IN_ENDPOINT: &str = "accounts:signInWithPassword";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Largest token lifetime accepted from the provider (one year).
/// Identity tokens normally live for an hour.
pub const MAX_EXPIRES_IN_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponseData {
    id_token: String,
    email: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: String,
    local_id: String,
    #[serde(default)]
    registered: Option<bool>,
}

/// A successful sign-up or sign-in, before it becomes a `Session`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub email: String,
    pub user_id: String,
    pub token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
    pub registered: Option<bool>,
}

impl TryFrom<AuthResponseData> for AuthResult {
    type Error = AuthError;

    fn try_from(data: AuthResponseData) -> std::result::Result<Self, Self::Error> {
        let expires_in_secs = data
            .expires_in
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|secs| (-MAX_EXPIRES_IN_SECS..=MAX_EXPIRES_IN_SECS).contains(secs))
            .ok_or_else(|| {
                AuthError::Unknown(format!("invalid expiresIn value: {:?}", data.expires_in))
            })?;

        Ok(Self {
            email: data.email,
            user_id: data.local_id,
            token: data.id_token,
            refresh_token: data.refresh_token,
            expires_in_secs,
            registered: data.registered,
        })
    }
}

/// Identity provider client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl IdentityClient {
    /// Create a client for the public identity endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_IDENTITY_BASE_URL)
    }

    /// Create a client against a different base URL (emulator, tests)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Register a new account
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResult, AuthError> {
        self.post_credentials(SIGN_UP_ENDPOINT, email, password).await
    }

    /// Sign in to an existing account
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, AuthError> {
        self.post_credentials(SIGN_IN_ENDPOINT, email, password).await
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Issue exactly one request. No retries.
    async fn post_credentials(
        &self,
        endpoint: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResult, AuthError> {
        let url = self.endpoint_url(endpoint);
        debug!(endpoint, email, "Sending identity request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&CredentialsRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| {
                warn!(endpoint, error = %e, "Identity request failed");
                AuthError::from(e)
            })?;

        let response = Self::check_response(endpoint, response).await?;

        let data: AuthResponseData = response.json().await.map_err(|e| {
            warn!(endpoint, error = %e, "Failed to parse identity response");
            AuthError::from(e)
        })?;

        AuthResult::try_from(data)
    }

    /// Check if response is successful, mapping the provider error body if not.
    async fn check_response(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, AuthError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = AuthError::from_error_body(&body);
        warn!(endpoint, %status, error = ?err, "Identity provider rejected request");
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_data(expires_in: &str) -> AuthResponseData {
        AuthResponseData {
            id_token: "tok1".to_string(),
            email: "a@b.com".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: expires_in.to_string(),
            local_id: "u1".to_string(),
            registered: None,
        }
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let client = IdentityClient::with_base_url("key", "http://localhost:9099/v1/")
            .expect("client should build");
        assert_eq!(
            client.endpoint_url(SIGN_UP_ENDPOINT),
            "http://localhost:9099/v1/accounts:signUp"
        );
        assert_eq!(
            client.endpoint_url(SIGN_IN_ENDPOINT),
            "http://localhost:9099/v1/accounts:signInWithPassword"
        );
    }

    #[test]
    fn test_default_base_url() {
        let client = IdentityClient::new("key").expect("client should build");
        assert_eq!(client.base_url(), DEFAULT_IDENTITY_BASE_URL);
    }

    #[test]
    fn test_auth_result_from_response() {
        let result = AuthResult::try_from(response_data("3600")).expect("valid response");
        assert_eq!(result.email, "a@b.com");
        assert_eq!(result.user_id, "u1");
        assert_eq!(result.token, "tok1");
        assert_eq!(result.expires_in_secs, 3600);
    }

    #[test]
    fn test_auth_result_rejects_bad_expires_in() {
        let err = AuthResult::try_from(response_data("soon")).unwrap_err();
        assert!(matches!(err, AuthError::Unknown(_)));
    }

    #[test]
    fn test_auth_result_rejects_out_of_range_expires_in() {
        for expires_in in ["9223372036854775807", "-9223372036854775808", "10000000000000", "-10000000000000"] {
            let err = AuthResult::try_from(response_data(expires_in)).unwrap_err();
            assert!(matches!(err, AuthError::Unknown(_)), "expiresIn {}", expires_in);
        }

        let limit = MAX_EXPIRES_IN_SECS.to_string();
        assert!(AuthResult::try_from(response_data(&limit)).is_ok());
    }

    #[test]
    fn test_parse_sign_in_response() {
        let json = r#"{"kind":"identitytoolkit#VerifyPasswordResponse","localId":"u1","email":"a@b.com","displayName":"","idToken":"tok1","registered":true,"refreshToken":"r1","expiresIn":"3600"}"#;
        let data: AuthResponseData =
            serde_json::from_str(json).expect("Failed to parse sign-in test JSON");
        assert_eq!(data.registered, Some(true));

        let result = AuthResult::try_from(data).expect("valid response");
        assert_eq!(result.refresh_token, "r1");
    }

    #[test]
    fn test_credentials_request_shape() {
        let body = serde_json::to_value(CredentialsRequest {
            email: "a@b.com",
            password: "pw",
            return_secure_token: true,
        })
        .expect("serializable");
        assert_eq!(
            body,
            serde_json::json!({"email": "a@b.com", "password": "pw", "returnSecureToken": true})
        );
    }
}
