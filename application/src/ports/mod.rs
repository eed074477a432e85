//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod connection_store;
pub mod provider_client;
pub mod token_exchanger;
