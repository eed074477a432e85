//! Domain layer for toolgate
//!
//! This crate contains the pure isolation rules and the entities they act on.
//! It has no dependencies on infrastructure, runtime or I/O concerns.
//!
//! # Core Concepts
//!
//! ## Tenant isolation
//!
//! Every [`Connection`] belongs to exactly one organization. A tool call is
//! only allowed when the caller's organization owns the connection.
//!
//! ## Namespaces
//!
//! Tool names carry the namespace of the provider that serves them
//! (`notion__getTasks`). The namespace must match both the connection's
//! provider and the execution path the router chose.

pub mod connection;
pub mod core;
pub mod isolation;
pub mod tool;

// Re-export commonly used types
pub use connection::{Connection, ConnectionConfig, Credentials};
pub use crate::core::{
    error::{IsolationError, IsolationViolation},
    ids::{ConnectionId, OrganizationId},
};
pub use isolation::{execute_tool_with_isolation, validate_tool_access};
pub use tool::{
    IsolatedToolCall, ParseToolNameError, ParsedToolName, ToolRequest, normalize_namespace,
    parse_tool_name, qualified_tool_name,
};
