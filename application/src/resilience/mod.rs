//! Fault isolation for remote provider calls.

pub mod circuit_breaker;
pub mod registry;

pub use circuit_breaker::{BreakerError, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use registry::CircuitBreakerRegistry;
