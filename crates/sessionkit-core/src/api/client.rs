//! HTTP client for the remote login service.
//!
//! `AuthClient` posts credentials to `{api_url}/login` and verifies stored
//! tokens against `{api_url}/auth/verify`. It is the production
//! implementation of both `LoginService` and `FreshnessCheck`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::{Credentials, FreshnessCheck, LoginService};
use crate::config::Config;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Body of the login call. `remember` never leaves the client.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<&Credentials> for LoginRequest {
    fn from(credentials: &Credentials) -> Self {
        Self {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One element of the login response. Only `token` matters to the login
/// flow; everything else the service sends is kept in `fields`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(flatten)]
    pub fields: HashMap<String, serde_json::Value>,
}

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base_url: String,
    initial_backoff: Duration,
}

impl AuthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Override the first 429 backoff delay; later retries double it.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(&config.api_url, Duration::from_secs(config.request_timeout_secs))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Send a request, retrying with exponential backoff while the server
    /// answers 429. Any other status is returned to the caller as-is.
    async fn send_with_retry<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = build().send().await?;
            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(
                url = %response.url(),
                retry = retries,
                backoff_ms = backoff.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2; // Exponential backoff
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Exchange credentials for the user records carrying a session token
    pub async fn login(&self, request: &LoginRequest) -> Result<Vec<UserRecord>, ApiError> {
        let url = self.url("login");
        let response = self
            .send_with_retry(|| self.client.post(&url).json(request))
            .await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        let users = parse_user_records(&text)?;
        debug!(records = users.len(), "Login response received");
        Ok(users)
    }

    /// Ask the service whether `token` is still accepted.
    /// 401/403 mean no; other failures are errors.
    pub async fn verify_token(&self, token: &str) -> Result<bool, ApiError> {
        let url = self.url("auth/verify");
        let response = self
            .send_with_retry(|| self.client.get(&url).bearer_auth(token))
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            _ => Self::check_response(response).await.map(|_| true),
        }
    }
}

fn parse_user_records(body: &str) -> Result<Vec<UserRecord>, ApiError> {
    serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
}

#[async_trait]
impl LoginService for AuthClient {
    async fn login(&self, request: &LoginRequest) -> Result<Vec<UserRecord>, ApiError> {
        AuthClient::login(self, request).await
    }
}

#[async_trait]
impl FreshnessCheck for AuthClient {
    async fn is_fresh(&self, token: &str) -> anyhow::Result<bool> {
        Ok(self.verify_token(token).await?)
    }
}
