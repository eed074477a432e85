//! Identifier newtypes shared across the domain.

use serde::{Deserialize, Serialize};

/// Identifier of an organization (the tenant boundary).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationId(String);

impl OrganizationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for OrganizationId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

/// Identifier of a stored provider connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<T: Into<String>> From<T> for ConnectionId {
    fn from(s: T) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let org = OrganizationId::new("org-123");
        assert_eq!(serde_json::to_string(&org).unwrap(), "\"org-123\"");

        let conn: ConnectionId = serde_json::from_str("\"conn-notion-org1\"").unwrap();
        assert_eq!(conn.as_str(), "conn-notion-org1");
        assert_eq!(conn.to_string(), "conn-notion-org1");
    }

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(OrganizationId::from("org-1"), OrganizationId::new("org-1"));
        assert_ne!(OrganizationId::from("org-1"), OrganizationId::from("org-2"));
    }
}
