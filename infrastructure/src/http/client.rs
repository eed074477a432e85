//! Bearer-authenticated JSON client for provider REST APIs.
//!
//! The token is read from the [`CredentialLease`] on every request, so a
//! refresh done by the token guard takes effect without rebuilding the client.

use reqwest::RequestBuilder;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use toolgate_application::CredentialLease;
use tracing::debug;

/// Longest response body echoed into [`ProviderHttpError::Status`]
const MAX_ERROR_BODY: usize = 500;

#[derive(Error, Debug)]
pub enum ProviderHttpError {
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("invalid provider response: {0}")]
    Decode(String),
}

pub struct ProviderHttpClient {
    http: reqwest::Client,
    provider: String,
    base_url: String,
    headers: HashMap<String, String>,
    lease: Arc<CredentialLease>,
}

impl ProviderHttpClient {
    pub(crate) fn new(
        http: reqwest::Client,
        provider: impl Into<String>,
        base_url: impl Into<String>,
        headers: HashMap<String, String>,
        lease: Arc<CredentialLease>,
    ) -> Self {
        Self {
            http,
            provider: provider.into(),
            base_url: base_url.into(),
            headers,
            lease,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub async fn get_json(&self, path: &str) -> Result<Value, ProviderHttpError> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, ProviderHttpError> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn send(&self, mut request: RequestBuilder) -> Result<Value, ProviderHttpError> {
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }
        if let Some(secret) = self.lease.secret() {
            request = request.bearer_auth(secret);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderHttpError::Transport(e.to_string()))?;
        let status = response.status();
        debug!(provider = %self.provider, status = status.as_u16(), "Provider responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderHttpError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderHttpError::Transport(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ProviderHttpError::Decode(e.to_string()))
    }
}
