//! Connection domain module
//!
//! A connection binds one organization to one provider and holds the
//! credentials used to call that provider's API.

pub mod credentials;
pub mod entities;

pub use credentials::Credentials;
pub use entities::{Connection, ConnectionConfig};
