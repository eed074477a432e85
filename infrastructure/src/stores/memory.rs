//! In-memory connection store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use toolgate_application::{ConnectionStore, StoreError};
use toolgate_domain::{Connection, ConnectionId, Credentials, OrganizationId};

/// Connection store backed by a map. Used for tests and ephemeral setups.
#[derive(Default)]
pub struct InMemoryConnectionStore {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connections(connections: impl IntoIterator<Item = Connection>) -> Self {
        let store = Self::new();
        for connection in connections {
            store.insert(connection);
        }
        store
    }

    /// Insert or replace a connection.
    pub fn insert(&self, connection: Connection) {
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(connection.id().clone(), connection);
    }

    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Connection> {
        self.connections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn find(&self, connection_id: &ConnectionId) -> Result<Option<Connection>, StoreError> {
        Ok(self
            .connections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(connection_id)
            .cloned())
    }

    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Connection>, StoreError> {
        let connections = self.connections.read().unwrap_or_else(|e| e.into_inner());
        let mut owned: Vec<Connection> = connections
            .values()
            .filter(|c| c.organization_id() == organization_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(owned)
    }

    async fn save_credentials(
        &self,
        connection_id: &ConnectionId,
        credentials: &Credentials,
    ) -> Result<(), StoreError> {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        let connection = connections
            .get_mut(connection_id)
            .ok_or_else(|| StoreError::NotFound(connection_id.to_string()))?;
        connection.set_credentials(credentials.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryConnectionStore {
        InMemoryConnectionStore::with_connections([
            Connection::new("conn-a1", "org-a", "notion", "A Notion"),
            Connection::new("conn-a2", "org-a", "linear", "A Linear"),
            Connection::new("conn-b1", "org-b", "notion", "B Notion"),
        ])
    }

    #[tokio::test]
    async fn test_find_for_organization_hides_other_tenants() {
        let store = store();
        let org_a = OrganizationId::new("org-a");

        assert!(store.find(&ConnectionId::new("conn-b1")).await.unwrap().is_some());
        assert!(
            store
                .find_for_organization(&org_a, &ConnectionId::new("conn-b1"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_for_organization(&org_a, &ConnectionId::new("conn-a1"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_list_for_organization() {
        let ids: Vec<String> = store()
            .list_for_organization(&OrganizationId::new("org-a"))
            .await
            .unwrap()
            .iter()
            .map(|c| c.id().to_string())
            .collect();
        assert_eq!(ids, vec!["conn-a1", "conn-a2"]);
    }

    #[tokio::test]
    async fn test_save_credentials() {
        let store = store();
        let id = ConnectionId::new("conn-a1");
        store
            .save_credentials(&id, &Credentials::oauth("fresh"))
            .await
            .unwrap();

        let saved = store.find(&id).await.unwrap().unwrap();
        assert_eq!(saved.credentials().map(|c| c.secret()), Some("fresh"));

        let missing = store
            .save_credentials(&ConnectionId::new("nope"), &Credentials::oauth("x"))
            .await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }
}
