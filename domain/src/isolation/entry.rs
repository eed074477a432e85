//! Execution isolation entry point (pure part)
//!
//! On top of [`validate_tool_access`], the router's target namespace must
//! match the parsed namespace. This catches requests dispatched through the
//! wrong provider's execution path even when the tool name and connection
//! are individually valid (a Linear-shaped tool routed through Notion).

use super::validator::validate_tool_access;
use crate::core::error::IsolationError;
use crate::core::ids::OrganizationId;
use crate::tool::name::normalize_namespace;
use crate::tool::request::{IsolatedToolCall, ToolRequest};

/// Resolve a request into an [`IsolatedToolCall`], or fail with an
/// audit-complete [`IsolationError`].
///
/// Arguments are passed through untouched; absent arguments stay absent.
pub fn execute_tool_with_isolation(
    request: &ToolRequest,
    target_namespace: &str,
    caller_organization_id: &OrganizationId,
) -> Result<IsolatedToolCall, IsolationError> {
    let connection = &request.connection;
    let provider = connection.namespace();

    let parsed = validate_tool_access(
        &request.tool_name,
        connection.provider(),
        caller_organization_id,
        connection,
    )?;

    // validate_tool_access only succeeds with a namespace present
    let namespace = parsed.namespace().unwrap_or(provider.as_str()).to_string();
    let target = normalize_namespace(target_namespace);
    if namespace != target {
        return Err(IsolationError::RoutingMismatch {
            tool_name: request.tool_name.clone(),
            provider,
            expected: target,
            received: namespace,
            connection_id: connection.id().to_string(),
        });
    }

    Ok(IsolatedToolCall {
        resolved_tool_name: parsed.tool_name,
        resolved_arguments: request.arguments.clone(),
        namespace,
        is_legacy: parsed.is_legacy,
        provider,
        connection_id: connection.id().clone(),
        organization_id: connection.organization_id().clone(),
    })
}
