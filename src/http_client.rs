use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::error::SyncError;

/// Build the shared HTTP client
pub fn build_client(connect_timeout: u64, request_timeout: u64) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout))
        .timeout(Duration::from_secs(request_timeout))
        .build()
        .context("Failed to create HTTP client")
}

/// Connect-protocol error body
#[derive(Deserialize)]
struct ConnectError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Request gateway that attaches the current bearer credential
///
/// Holds no state of its own and never retries; an authorization failure
/// comes back as [`SyncError::AuthorizationExpired`] for the caller to act on.
#[derive(Clone)]
pub struct AuthenticatedGateway {
    /// Shared HTTP client with connection pooling
    client: Client,

    tokens: TokenManager,
}

impl AuthenticatedGateway {
    pub fn new(client: Client, tokens: TokenManager) -> Self {
        Self { client, tokens }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Attach `Authorization: Bearer` if a credential is available
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.current_credential() {
            Some(token) => request.header(AUTHORIZATION, token.header_value()),
            None => {
                tracing::debug!("No bearer credential, sending unauthenticated request");
                request
            }
        }
    }

    /// Send an authorized request and classify the outcome
    pub async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, SyncError> {
        let request = self
            .authorize(request)
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to build request: {}", e)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");

        let response = self.client.execute(request).await.map_err(|e| {
            tracing::warn!(error = %e, url = %url, "HTTP request error");
            SyncError::from_transport(&e)
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = %status, "Request successful");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body))
    }
}

/// Separate authorization failures from generic service errors
pub(crate) fn classify_failure(status: StatusCode, body: &str) -> SyncError {
    let connect: Option<ConnectError> = serde_json::from_str(body).ok();
    let code = connect.as_ref().and_then(|c| c.code.as_deref());
    let message = connect
        .as_ref()
        .and_then(|c| c.message.clone())
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::UNAUTHORIZED || code == Some("unauthenticated") {
        tracing::warn!(status = %status, "Bearer credential rejected");
        return SyncError::AuthorizationExpired(format!("{} - {}", status.as_u16(), message));
    }

    tracing::error!(status = status.as_u16(), response_body = %body, "HTTP request failed with error response");
    SyncError::Http {
        status: status.as_u16(),
        message,
    }
}
