//! Application-level configuration.
//!
//! - [`IsolationParams`]: breaker thresholds, pool eviction and token refresh tuning

pub mod isolation_params;

pub use isolation_params::{BreakerParams, BreakerScope, IsolationParams, PoolParams, TokenParams};
