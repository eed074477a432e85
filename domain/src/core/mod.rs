//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`]: organization and connection identifiers
//! - [`error::IsolationError`]: audit-complete isolation failures

pub mod error;
pub mod ids;
