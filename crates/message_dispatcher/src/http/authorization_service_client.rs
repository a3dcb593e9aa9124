use async_trait::async_trait;
use common::domain::{CallerIdentity, DomainError, DomainResult, IdentityProvider};
use reqwest::header::HeaderValue;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Header carrying the caller's credential token, both on intake and towards the authorization service
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: String,
    api_key: String,
}

/// Translates credential tokens into caller identities through the authorization service
pub struct AuthorizationServiceClient {
    base_url: String,
    client: Client,
}

impl AuthorizationServiceClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl IdentityProvider for AuthorizationServiceClient {
    #[instrument(skip_all)]
    async fn identity_from_token(&self, token: &str) -> DomainResult<CallerIdentity> {
        if token.trim().is_empty() {
            return Err(DomainError::Unauthenticated("missing token".to_string()));
        }
        let header_value = HeaderValue::from_str(token)
            .map_err(|_| DomainError::Unauthenticated("malformed token".to_string()))?;

        let response = self
            .client
            .get(format!("{}/me", self.base_url))
            .header(AUTH_TOKEN_HEADER, header_value)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "authorization service unreachable");
                DomainError::Unauthenticated(format!("authorization service unavailable: {}", e))
            })?;

        match response.status() {
            status if status.is_success() => {
                let user: UserResponse = response.json().await.map_err(|e| {
                    DomainError::Unauthenticated(format!("invalid user payload: {}", e))
                })?;
                if user.api_key.is_empty() {
                    return Err(DomainError::Unauthenticated(
                        "user has no API key".to_string(),
                    ));
                }
                debug!(user_id = %user.id, "token resolved");
                Ok(CallerIdentity::new(user.id, user.api_key))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(DomainError::Unauthenticated("invalid token".to_string()))
            }
            status => Err(DomainError::Unauthenticated(format!(
                "authorization service error: status {}",
                status
            ))),
        }
    }
}
