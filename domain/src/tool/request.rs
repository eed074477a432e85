//! Tool invocation envelopes
//!
//! [`ToolRequest`] is what workflow code hands to the isolation layer;
//! [`IsolatedToolCall`] is what comes out once every isolation rule passed.

use crate::connection::Connection;
use crate::core::ids::{ConnectionId, OrganizationId};
use serde::{Deserialize, Serialize};

/// A request to invoke a tool against a specific connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub tool_name: String,
    /// Arguments are opaque to this layer; `None` stays `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
    pub connection: Connection,
}

impl ToolRequest {
    pub fn new(tool_name: impl Into<String>, connection: Connection) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments: None,
            connection,
        }
    }

    pub fn with_arguments(mut self, arguments: serde_json::Value) -> Self {
        self.arguments = Some(arguments);
        self
    }
}

/// A tool call that passed namespace, tenant and routing checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolatedToolCall {
    /// Bare tool name, without namespace.
    pub resolved_tool_name: String,
    pub resolved_arguments: Option<serde_json::Value>,
    pub namespace: String,
    pub is_legacy: bool,
    pub provider: String,
    pub connection_id: ConnectionId,
    pub organization_id: OrganizationId,
}
