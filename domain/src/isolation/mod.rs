//! Isolation rules
//!
//! - [`validator::validate_tool_access`]: namespace + tenant checks
//! - [`entry::execute_tool_with_isolation`]: adds the routing check and
//!   produces an [`IsolatedToolCall`](crate::tool::IsolatedToolCall)

pub mod entry;
pub mod validator;

pub use entry::execute_tool_with_isolation;
pub use validator::validate_tool_access;
