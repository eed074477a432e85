//! Isolation error types
//!
//! Every variant carries the fields needed to reconstruct a complete audit
//! record. The `Display` rendering is a single line of `key=value` pairs after
//! a short headline so the message alone is enough for an audit trail:
//!
//! ```text
//! organization mismatch for tool notion__getTasks: tool=notion__getTasks provider=notion
//!     expected_organization=org-123 received_organization=org-456 connection_id=conn-notion-org1
//! ```

use thiserror::Error;

/// Which isolation rule a request violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationViolation {
    MissingNamespace,
    NamespaceMismatch,
    OrganizationMismatch,
    RoutingMismatch,
}

impl IsolationViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            IsolationViolation::MissingNamespace => "missing_namespace",
            IsolationViolation::NamespaceMismatch => "namespace_mismatch",
            IsolationViolation::OrganizationMismatch => "organization_mismatch",
            IsolationViolation::RoutingMismatch => "routing_mismatch",
        }
    }
}

impl std::fmt::Display for IsolationViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure raised by tool-access validation and the isolation entry point.
///
/// None of these are ever retried: they are either caller bugs or security
/// violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IsolationError {
    #[error(
        "missing namespace for tool {tool_name}: tool={tool_name} provider={provider} connection_id={connection_id}"
    )]
    MissingNamespace {
        tool_name: String,
        provider: String,
        connection_id: String,
    },

    #[error(
        "namespace mismatch for tool {tool_name}: tool={tool_name} provider={provider} expected={expected} received={received} connection_id={connection_id}"
    )]
    NamespaceMismatch {
        tool_name: String,
        provider: String,
        expected: String,
        received: String,
        connection_id: String,
    },

    #[error(
        "organization mismatch for tool {tool_name}: tool={tool_name} provider={provider} expected_organization={expected_organization} received_organization={received_organization} connection_id={connection_id}"
    )]
    OrganizationMismatch {
        tool_name: String,
        provider: String,
        expected_organization: String,
        received_organization: String,
        connection_id: String,
    },

    #[error(
        "namespace routing mismatch for tool {tool_name}: tool={tool_name} provider={provider} expected={expected} received={received} connection_id={connection_id}"
    )]
    RoutingMismatch {
        tool_name: String,
        provider: String,
        expected: String,
        received: String,
        connection_id: String,
    },
}

impl IsolationError {
    pub fn violation(&self) -> IsolationViolation {
        match self {
            IsolationError::MissingNamespace { .. } => IsolationViolation::MissingNamespace,
            IsolationError::NamespaceMismatch { .. } => IsolationViolation::NamespaceMismatch,
            IsolationError::OrganizationMismatch { .. } => IsolationViolation::OrganizationMismatch,
            IsolationError::RoutingMismatch { .. } => IsolationViolation::RoutingMismatch,
        }
    }

    /// Cross-tenant access attempts must be logged as security events.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, IsolationError::OrganizationMismatch { .. })
    }

    pub fn tool_name(&self) -> &str {
        match self {
            IsolationError::MissingNamespace { tool_name, .. }
            | IsolationError::NamespaceMismatch { tool_name, .. }
            | IsolationError::OrganizationMismatch { tool_name, .. }
            | IsolationError::RoutingMismatch { tool_name, .. } => tool_name,
        }
    }

    pub fn connection_id(&self) -> &str {
        match self {
            IsolationError::MissingNamespace { connection_id, .. }
            | IsolationError::NamespaceMismatch { connection_id, .. }
            | IsolationError::OrganizationMismatch { connection_id, .. }
            | IsolationError::RoutingMismatch { connection_id, .. } => connection_id,
        }
    }

    /// Audit fields as ordered key/value pairs, matching the `Display` output.
    pub fn audit_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            IsolationError::MissingNamespace {
                tool_name,
                provider,
                connection_id,
            } => vec![
                ("tool", tool_name),
                ("provider", provider),
                ("connection_id", connection_id),
            ],
            IsolationError::NamespaceMismatch {
                tool_name,
                provider,
                expected,
                received,
                connection_id,
            }
            | IsolationError::RoutingMismatch {
                tool_name,
                provider,
                expected,
                received,
                connection_id,
            } => vec![
                ("tool", tool_name),
                ("provider", provider),
                ("expected", expected),
                ("received", received),
                ("connection_id", connection_id),
            ],
            IsolationError::OrganizationMismatch {
                tool_name,
                provider,
                expected_organization,
                received_organization,
                connection_id,
            } => vec![
                ("tool", tool_name),
                ("provider", provider),
                ("expected_organization", expected_organization),
                ("received_organization", received_organization),
                ("connection_id", connection_id),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org_mismatch() -> IsolationError {
        IsolationError::OrganizationMismatch {
            tool_name: "notion__getTasks".to_string(),
            provider: "notion".to_string(),
            expected_organization: "org-123".to_string(),
            received_organization: "org-456".to_string(),
            connection_id: "conn-notion-org1".to_string(),
        }
    }

    #[test]
    fn test_display_renders_every_audit_field() {
        let error = org_mismatch();
        let message = error.to_string();

        assert!(message.starts_with("organization mismatch for tool notion__getTasks"));
        for (key, value) in error.audit_fields() {
            assert!(
                message.contains(&format!("{key}={value}")),
                "missing {key}={value} in {message}"
            );
        }
    }

    #[test]
    fn test_only_organization_mismatch_is_security_violation() {
        assert!(org_mismatch().is_security_violation());

        let routing = IsolationError::RoutingMismatch {
            tool_name: "linear__createIssue".to_string(),
            provider: "linear".to_string(),
            expected: "notion".to_string(),
            received: "linear".to_string(),
            connection_id: "conn-linear".to_string(),
        };
        assert!(!routing.is_security_violation());
        assert_eq!(routing.violation(), IsolationViolation::RoutingMismatch);
        assert!(routing.to_string().contains("namespace routing mismatch"));
    }

    #[test]
    fn test_accessors() {
        let error = org_mismatch();
        assert_eq!(error.tool_name(), "notion__getTasks");
        assert_eq!(error.connection_id(), "conn-notion-org1");
        assert_eq!(error.violation().as_str(), "organization_mismatch");
    }
}
