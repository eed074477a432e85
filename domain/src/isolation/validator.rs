//! Tool access validation
//!
//! Checks run in a fixed order and stop at the first violation:
//!
//! 1. the tool name must carry a namespace
//! 2. that namespace must be the provider's namespace
//! 3. the caller's organization must own the connection
//!
//! Namespace and tenant are independent axes: a request can fail either one
//! regardless of the other. Validation is synchronous and performs no I/O, so
//! it runs on every single invocation.

use crate::connection::Connection;
use crate::core::error::IsolationError;
use crate::core::ids::OrganizationId;
use crate::tool::name::{ParsedToolName, normalize_namespace, parse_tool_name};

/// Validate that `raw_name` may be invoked against `connection` on behalf of
/// `caller_organization_id`.
pub fn validate_tool_access(
    raw_name: &str,
    provider: &str,
    caller_organization_id: &OrganizationId,
    connection: &Connection,
) -> Result<ParsedToolName, IsolationError> {
    let expected_namespace = normalize_namespace(provider);

    let parsed = parse_tool_name(raw_name, provider).map_err(|_| {
        IsolationError::MissingNamespace {
            tool_name: raw_name.to_string(),
            provider: expected_namespace.clone(),
            connection_id: connection.id().to_string(),
        }
    })?;

    let Some(received_namespace) = parsed.namespace() else {
        return Err(IsolationError::MissingNamespace {
            tool_name: raw_name.to_string(),
            provider: expected_namespace,
            connection_id: connection.id().to_string(),
        });
    };

    if received_namespace != expected_namespace {
        return Err(IsolationError::NamespaceMismatch {
            tool_name: raw_name.to_string(),
            provider: expected_namespace.clone(),
            expected: expected_namespace,
            received: received_namespace.to_string(),
            connection_id: connection.id().to_string(),
        });
    }

    if caller_organization_id != connection.organization_id() {
        return Err(IsolationError::OrganizationMismatch {
            tool_name: raw_name.to_string(),
            provider: expected_namespace,
            expected_organization: connection.organization_id().to_string(),
            received_organization: caller_organization_id.to_string(),
            connection_id: connection.id().to_string(),
        });
    }

    Ok(parsed)
}
