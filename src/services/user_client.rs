/*
 * Responsibility
 * - Remote token validation against the users-management service
 * - TokenValidator is the seam: the gateway depends on the trait, the
 *   reqwest client is the production implementation
 * - The HTTP client carries the outbound timeout budget; a timed-out or
 *   failed call surfaces as UserClientError, never a hung request task
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::middleware::auth::context::AuthUser;

const VALIDATE_TOKEN_PATH: &str = "/v1/api/auth/validate-token";

#[derive(Debug, Error)]
pub enum UserClientError {
    #[error("users service call failed")]
    Http(#[from] reqwest::Error),
    #[error("invalid users service url")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Serialize)]
struct ValidateTokenRequest<'a> {
    token: &'a str,
}

/// The validation outcome as the users service reports it. `valid = true`
/// is only trusted together with a present id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTokenResponse {
    pub id: Option<i64>,
    pub email: Option<String>,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ValidateTokenResponse {
    /// The principal this outcome resolves to, if any. An invalid token or
    /// a valid-shaped response without an id resolves to nobody.
    pub fn identity(&self) -> Option<AuthUser> {
        if !self.valid {
            return None;
        }
        let id = self.id?;
        Some(AuthUser {
            id,
            email: self.email.clone().unwrap_or_default(),
        })
    }
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate_token(&self, token: &str) -> Result<ValidateTokenResponse, UserClientError>;
}

pub struct UserClient {
    http: Client,
    validate_url: Url,
}

impl UserClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, UserClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        let validate_url = base_url.join(VALIDATE_TOKEN_PATH)?;

        Ok(Self { http, validate_url })
    }
}

#[async_trait]
impl TokenValidator for UserClient {
    async fn validate_token(&self, token: &str) -> Result<ValidateTokenResponse, UserClientError> {
        let response = self
            .http
            .post(self.validate_url.clone())
            .json(&ValidateTokenRequest { token })
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}
