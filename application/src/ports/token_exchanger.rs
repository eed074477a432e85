//! Token exchanger port
//!
//! Exchanges a refresh token for a new access token at the provider's
//! OAuth token endpoint.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result of a successful refresh exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Rotated refresh token, when the provider issues one.
    pub refresh_token: Option<String>,
    /// Lifetime of the new access token, when the provider reports one.
    pub expires_in: Option<Duration>,
}

impl TokenGrant {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }
}

/// Errors that can occur during a refresh exchange
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Token endpoint rejected refresh (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Token endpoint unreachable: {0}")]
    Transport(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("No token endpoint configured for provider: {0}")]
    UnsupportedProvider(String),
}

/// Port for OAuth refresh exchanges
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn refresh(&self, provider: &str, refresh_token: &str) -> Result<TokenGrant, ExchangeError>;
}
