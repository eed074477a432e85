//! Provider client factory port
//!
//! Builds live API clients for a provider. Clients receive the shared
//! [`CredentialLease`] rather than a token copy so a refresh performed by the
//! token guard is visible to them on their next request.

use crate::credentials::CredentialLease;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building a provider client
#[derive(Error, Debug)]
pub enum ClientFactoryError {
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),

    #[error("Client construction failed: {0}")]
    Construction(String),
}

/// Factory for provider API clients
#[async_trait]
pub trait ProviderClientFactory: Send + Sync {
    /// Client handle; must be safe for concurrent use.
    type Client: Send + Sync + 'static;

    async fn create_client(
        &self,
        provider: &str,
        lease: Arc<CredentialLease>,
    ) -> Result<Self::Client, ClientFactoryError>;
}
