//! Connection store port
//!
//! Defines how the application layer reads connection records and writes
//! refreshed credentials back. Persistence itself lives outside this crate.

use async_trait::async_trait;
use thiserror::Error;
use toolgate_domain::{Connection, ConnectionId, Credentials, OrganizationId};

/// Errors that can occur while accessing the connection store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// Port for connection persistence
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Look up a connection by id, regardless of organization.
    async fn find(&self, connection_id: &ConnectionId) -> Result<Option<Connection>, StoreError>;

    /// Look up a connection owned by `organization_id`.
    ///
    /// Connections belonging to another organization are reported as absent.
    async fn find_for_organization(
        &self,
        organization_id: &OrganizationId,
        connection_id: &ConnectionId,
    ) -> Result<Option<Connection>, StoreError> {
        Ok(self
            .find(connection_id)
            .await?
            .filter(|c| c.organization_id() == organization_id))
    }

    /// All connections owned by `organization_id`.
    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Connection>, StoreError>;

    /// Persist refreshed credentials into the connection's configuration.
    async fn save_credentials(
        &self,
        connection_id: &ConnectionId,
        credentials: &Credentials,
    ) -> Result<(), StoreError>;
}
