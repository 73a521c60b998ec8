//! Join-token endpoint client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the token endpoint exchange.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("token response missing field `{0}`")]
    MissingField(&'static str),
}

impl TokenError {
    /// HTTP status attached to the failure, when one was received.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            TokenError::Status { status } => Some(*status),
            TokenError::Request(e) => e.status().map(|s| s.as_u16()),
            TokenError::MissingField(_) => None,
        }
    }
}

/// Request body for the token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    pub room_name: String,
    pub participant_name: String,
    pub participant_identity: String,
}

/// A granted join token plus the media server URL to connect to.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub token: String,
    pub live_url: String,
}

/// Upstream systems disagree on the URL key; accept either spelling.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    token: Option<String>,
    #[serde(rename = "liveUrl")]
    live_url: Option<String>,
    livekit_url: Option<String>,
}

/// Client for the backend token endpoint.
#[derive(Debug, Clone)]
pub struct TokenClient {
    endpoint: String,
    http: reqwest::Client,
}

impl TokenClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Exchanges participant details for a join token.
    pub async fn fetch(&self, request: &TokenRequest) -> Result<TokenGrant, TokenError> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::Status {
                status: status.as_u16(),
            });
        }

        let raw: RawTokenResponse = response.json().await?;
        let token = raw.token.ok_or(TokenError::MissingField("token"))?;
        let live_url = raw
            .live_url
            .or(raw.livekit_url)
            .ok_or(TokenError::MissingField("liveUrl"))?;
        Ok(TokenGrant { token, live_url })
    }
}
