//! Pooled provider clients keyed by tenant and credential fingerprint.

pub mod client_pool;
pub mod fingerprint;

pub use client_pool::{AcquireRequest, CallError, ClientPool, PoolKey, PoolStats, PooledClient};
pub use fingerprint::credential_fingerprint;
