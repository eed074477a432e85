//! Connection entity
//!
//! A [`Connection`] is one organization's link to one provider instance.
//! The owning organization is fixed at construction: there is no setter, so
//! a connection can never be reassigned to another tenant.

use super::credentials::Credentials;
use crate::core::ids::{ConnectionId, OrganizationId};
use crate::tool::name::normalize_namespace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection configuration: typed credentials plus provider-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    /// Opaque provider settings (workspace ids, base URLs, ...).
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub settings: serde_json::Map<String, serde_json::Value>,
}

/// A tenant's stored link to an external provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    id: ConnectionId,
    organization_id: OrganizationId,
    provider: String,
    display_name: String,
    #[serde(default)]
    config: ConnectionConfig,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn enabled_by_default() -> bool {
    true
}

impl Connection {
    pub fn new(
        id: impl Into<ConnectionId>,
        organization_id: impl Into<OrganizationId>,
        provider: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            provider: provider.into(),
            display_name: display_name.into(),
            config: ConnectionConfig::default(),
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.settings.insert(key.into(), value);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn organization_id(&self) -> &OrganizationId {
        &self.organization_id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Provider identifier normalized for namespace comparison.
    pub fn namespace(&self) -> String {
        normalize_namespace(&self.provider)
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.config.credentials.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace the stored credentials (e.g. after a token refresh).
    pub fn set_credentials(&mut self, credentials: Credentials) {
        self.config.credentials = Some(credentials);
        self.touch();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_connection_defaults() {
        let conn = Connection::new("conn-1", "org-1", " Notion ", "Team workspace");
        assert_eq!(conn.id().as_str(), "conn-1");
        assert_eq!(conn.organization_id().as_str(), "org-1");
        assert_eq!(conn.provider(), " Notion ");
        assert_eq!(conn.namespace(), "notion");
        assert!(conn.is_enabled());
        assert!(conn.credentials().is_none());
        assert_eq!(conn.created_at(), conn.updated_at());
    }

    #[test]
    fn test_set_credentials_touches_updated_at() {
        let mut conn = Connection::new("conn-1", "org-1", "linear", "Linear");
        let before = conn.updated_at();
        conn.set_credentials(Credentials::api_key("k"));
        assert!(conn.updated_at() >= before);
        assert_eq!(conn.credentials(), Some(&Credentials::api_key("k")));
        assert_eq!(conn.organization_id().as_str(), "org-1");
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{
            "id": "conn-notion-org1",
            "organization_id": "org-123",
            "provider": "notion",
            "display_name": "Notion",
            "config": {
                "credentials": { "kind": "oauth", "access_token": "at" },
                "settings": { "workspace": "ws-1" }
            },
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }"#;

        let conn: Connection = serde_json::from_str(json).unwrap();
        assert!(conn.is_enabled());
        assert_eq!(conn.credentials().map(|c| c.kind()), Some("oauth"));
        assert_eq!(
            conn.config().settings.get("workspace"),
            Some(&serde_json::json!("ws-1"))
        );
    }
}
