//! Shared credential holder
//!
//! A pooled client and the token guard hold the same [`CredentialLease`].
//! The guard swaps the credentials in place after a refresh, so the client
//! always reads the current token when it builds a request.

use std::sync::RwLock;
use toolgate_domain::{ConnectionId, Credentials};

pub struct CredentialLease {
    connection_id: Option<ConnectionId>,
    provider: String,
    credentials: RwLock<Option<Credentials>>,
}

impl CredentialLease {
    /// Lease bound to a stored connection; refreshed tokens are persisted back to it.
    pub fn new(
        connection_id: Option<ConnectionId>,
        provider: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            connection_id,
            provider: provider.into(),
            credentials: RwLock::new(credentials),
        }
    }

    /// Lease with fixed credentials that no connection record backs.
    pub fn detached(provider: impl Into<String>, credentials: Credentials) -> Self {
        Self::new(None, provider, Some(credentials))
    }

    /// Lease for unauthenticated access.
    pub fn anonymous(provider: impl Into<String>) -> Self {
        Self::new(None, provider, None)
    }

    pub fn connection_id(&self) -> Option<&ConnectionId> {
        self.connection_id.as_ref()
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Snapshot of the current credentials.
    pub fn current(&self) -> Option<Credentials> {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current secret (access token or API key).
    pub fn secret(&self) -> Option<String> {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|c| c.secret().to_string())
    }

    pub fn expires_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.credentials
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(Credentials::expires_at)
    }

    /// Swap in new credentials, returning the previous ones.
    pub fn replace(&self, credentials: Credentials) -> Option<Credentials> {
        self.credentials
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .replace(credentials)
    }
}

impl std::fmt::Debug for CredentialLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialLease")
            .field("connection_id", &self.connection_id)
            .field("provider", &self.provider)
            .field("credentials", &self.current())
            .finish()
    }
}
