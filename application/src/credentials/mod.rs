//! Credential handling: the shared lease and the token freshness guard.

pub mod lease;
pub mod token_guard;

pub use lease::CredentialLease;
pub use token_guard::{Freshness, RefreshError, TokenGuard};
