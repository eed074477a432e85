//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: connection stores, the OAuth token exchanger,
//! HTTP provider clients, and configuration file loading.

pub mod config;
pub mod http;
pub mod oauth;
pub mod stores;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigSource, ConfigValidationError, FileConfig};
pub use http::{HttpClientFactory, ProviderHttpClient, ProviderHttpError};
pub use oauth::{HttpTokenExchanger, OAuthEndpoint};
pub use stores::{InMemoryConnectionStore, JsonFileConnectionStore};
