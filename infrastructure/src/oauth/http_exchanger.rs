//! OAuth refresh over HTTP
//!
//! Implements [`TokenExchanger`] with a standard `grant_type=refresh_token`
//! form POST (RFC 6749 §6) against a per-provider token endpoint.

use crate::config::{FileOAuthConfig, FileOAuthProviderConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use toolgate_application::{ExchangeError, TokenExchanger, TokenGrant};
use toolgate_domain::normalize_namespace;
use tracing::debug;

/// Longest error body echoed into [`ExchangeError::Rejected`]
const MAX_ERROR_BODY: usize = 200;

/// Token endpoint of one provider.
#[derive(Clone)]
pub struct OAuthEndpoint {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl From<&FileOAuthProviderConfig> for OAuthEndpoint {
    fn from(config: &FileOAuthProviderConfig) -> Self {
        Self {
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct HttpTokenExchanger {
    client: reqwest::Client,
    endpoints: HashMap<String, OAuthEndpoint>,
}

impl HttpTokenExchanger {
    pub fn new(
        endpoints: impl IntoIterator<Item = (String, OAuthEndpoint)>,
        request_timeout: Duration,
    ) -> Result<Self, ExchangeError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ExchangeError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoints: endpoints
                .into_iter()
                .map(|(provider, endpoint)| (normalize_namespace(&provider), endpoint))
                .collect(),
        })
    }

    pub fn from_config(config: &FileOAuthConfig) -> Result<Self, ExchangeError> {
        Self::new(
            config
                .providers
                .iter()
                .map(|(provider, endpoint)| (provider.clone(), OAuthEndpoint::from(endpoint))),
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn supports(&self, provider: &str) -> bool {
        self.endpoints.contains_key(&normalize_namespace(provider))
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    async fn refresh(&self, provider: &str, refresh_token: &str) -> Result<TokenGrant, ExchangeError> {
        let endpoint = self
            .endpoints
            .get(&normalize_namespace(provider))
            .ok_or_else(|| ExchangeError::UnsupportedProvider(provider.to_string()))?;

        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", endpoint.client_id.as_str()),
        ];
        if let Some(secret) = &endpoint.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        debug!(provider, token_url = %endpoint.token_url, "Requesting token refresh");
        let response = self
            .client
            .post(&endpoint.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| ExchangeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::InvalidResponse(e.to_string()))?;
        if token.access_token.is_empty() {
            return Err(ExchangeError::InvalidResponse("empty access_token".to_string()));
        }

        let mut grant = TokenGrant::new(token.access_token);
        if let Some(rotated) = token.refresh_token.filter(|t| !t.is_empty()) {
            grant = grant.with_refresh_token(rotated);
        }
        if let Some(seconds) = token.expires_in {
            grant = grant.with_expires_in(Duration::from_secs(seconds));
        }
        Ok(grant)
    }
}
