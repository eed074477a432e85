//! JSON file connection store
//!
//! Connections live in a single JSON array on disk. The whole file is loaded
//! on open and rewritten (via a sibling temp file and rename) on every
//! credential save.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use toolgate_application::{ConnectionStore, StoreError};
use toolgate_domain::{Connection, ConnectionId, Credentials, OrganizationId};
use tracing::debug;

pub struct JsonFileConnectionStore {
    path: PathBuf,
    connections: RwLock<BTreeMap<ConnectionId, Connection>>,
}

impl JsonFileConnectionStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let connections = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<Connection> = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::Backend(format!("invalid connections file {}: {}", path.display(), e))
                })?;
                list.into_iter().map(|c| (c.id().clone(), c)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StoreError::Backend(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        debug!(path = %path.display(), count = connections.len(), "Loaded connection store");

        Ok(Self {
            path,
            connections: RwLock::new(connections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a connection and write the file.
    pub async fn upsert(&self, connection: Connection) -> Result<(), StoreError> {
        let mut connections = self.connections.write().await;
        connections.insert(connection.id().clone(), connection);
        self.persist(&connections).await
    }

    async fn persist(&self, connections: &BTreeMap<ConnectionId, Connection>) -> Result<(), StoreError> {
        let list: Vec<&Connection> = connections.values().collect();
        let json = serde_json::to_vec_pretty(&list)
            .map_err(|e| StoreError::Backend(format!("failed to encode connections: {e}")))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Backend(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Backend(format!("failed to replace {}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl ConnectionStore for JsonFileConnectionStore {
    async fn find(&self, connection_id: &ConnectionId) -> Result<Option<Connection>, StoreError> {
        Ok(self.connections.read().await.get(connection_id).cloned())
    }

    async fn list_for_organization(
        &self,
        organization_id: &OrganizationId,
    ) -> Result<Vec<Connection>, StoreError> {
        Ok(self
            .connections
            .read()
            .await
            .values()
            .filter(|c| c.organization_id() == organization_id)
            .cloned()
            .collect())
    }

    async fn save_credentials(
        &self,
        connection_id: &ConnectionId,
        credentials: &Credentials,
    ) -> Result<(), StoreError> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .get_mut(connection_id)
            .ok_or_else(|| StoreError::NotFound(connection_id.to_string()))?;
        connection.set_credentials(credentials.clone());
        self.persist(&connections).await
    }
}
