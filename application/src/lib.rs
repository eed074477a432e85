//! Application layer for toolgate
//!
//! This crate contains the resilience machinery around provider calls
//! (circuit breakers, token refresh, client pooling), the ports it needs
//! from infrastructure, and the tool invocation use case.
//! It depends only on the domain layer.

pub mod config;
pub mod credentials;
pub mod pool;
pub mod ports;
pub mod resilience;
pub mod use_cases;

// Re-export commonly used types
pub use config::{BreakerParams, BreakerScope, IsolationParams, PoolParams, TokenParams};
pub use credentials::{CredentialLease, Freshness, RefreshError, TokenGuard};
pub use pool::{AcquireRequest, CallError, ClientPool, PoolKey, PoolStats, PooledClient};
pub use ports::{
    connection_store::{ConnectionStore, StoreError},
    provider_client::{ClientFactoryError, ProviderClientFactory},
    token_exchanger::{ExchangeError, TokenExchanger, TokenGrant},
};
pub use resilience::{
    BreakerError, BreakerSnapshot, CircuitBreaker, CircuitBreakerRegistry, CircuitState,
};
pub use use_cases::invoke_tool::{
    InvokeToolError, InvokeToolInput, InvokeToolOutput, InvokeToolUseCase,
};
