//! Tool domain module
//!
//! Tools are remote provider operations exposed to workflows under a
//! provider namespace (`notion__getTasks`, `linear__createIssue`).
//!
//! ```text
//! ┌──────────────┐    ┌────────────────┐    ┌──────────────────┐
//! │ raw name     │───▶│ ParsedToolName │───▶│ IsolatedToolCall │
//! │ + provider   │    │ (namespace,    │    │ (validated for   │
//! │              │    │  tool, legacy) │    │  tenant + route) │
//! └──────────────┘    └────────────────┘    └──────────────────┘
//! ```
//!
//! - [`name`]: the pure tool-name parser
//! - [`request`]: request/result envelopes for the isolation entry point

pub mod name;
pub mod request;

pub use name::{
    NAMESPACE_SEPARATOR, ParseToolNameError, ParsedToolName, normalize_namespace, parse_tool_name,
    qualified_tool_name,
};
pub use request::{IsolatedToolCall, ToolRequest};
