//! Isolation parameters: breaker, pool and token-guard tuning.
//!
//! [`IsolationParams`] groups the static parameters of the resilience layer.
//! Infrastructure builds it from the config file; tests build it directly
//! with the builder methods.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Granularity of circuit breakers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerScope {
    /// One breaker per provider, shared by every tenant.
    #[default]
    Provider,
    /// One breaker per provider connection.
    Connection,
}

impl BreakerScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerScope::Provider => "provider",
            BreakerScope::Connection => "connection",
        }
    }
}

impl std::str::FromStr for BreakerScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "provider" => Ok(BreakerScope::Provider),
            "connection" => Ok(BreakerScope::Connection),
            other => Err(format!("unknown breaker scope: {other}")),
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakerParams {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close it again.
    pub success_threshold: u32,
    /// How long the breaker stays open before allowing trial calls.
    pub reset_timeout: Duration,
    /// Per-call time limit; exceeding it counts as a failure.
    pub call_timeout: Option<Duration>,
    /// Trial calls allowed in flight while half-open.
    pub half_open_max_calls: u32,
}

impl Default for BreakerParams {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            call_timeout: Some(Duration::from_secs(30)),
            half_open_max_calls: 1,
        }
    }
}

impl BreakerParams {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_half_open_max_calls(mut self, max: u32) -> Self {
        self.half_open_max_calls = max;
        self
    }
}

/// Client pool tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Unreferenced clients older than this are evicted.
    pub idle_timeout: Duration,
    /// Interval of the background reaper.
    pub reap_interval: Duration,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(300),
            reap_interval: Duration::from_secs(60),
        }
    }
}

/// Token freshness tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenParams {
    /// Tokens are refreshed this long before their nominal expiry.
    pub safety_skew: Duration,
    /// Serialize refreshes per connection instead of accepting the double-refresh race.
    pub single_flight: bool,
}

impl Default for TokenParams {
    fn default() -> Self {
        Self {
            safety_skew: Duration::from_secs(60),
            single_flight: false,
        }
    }
}

/// All tuning parameters of the isolation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsolationParams {
    pub breaker: BreakerParams,
    /// Per-provider breaker overrides, keyed by normalized provider namespace.
    pub breaker_overrides: HashMap<String, BreakerParams>,
    pub breaker_scope: BreakerScope,
    pub pool: PoolParams,
    pub token: TokenParams,
}

impl IsolationParams {
    // ==================== Builder Methods ====================

    pub fn with_breaker(mut self, breaker: BreakerParams) -> Self {
        self.breaker = breaker;
        self
    }

    pub fn with_breaker_override(mut self, provider: impl Into<String>, params: BreakerParams) -> Self {
        self.breaker_overrides
            .insert(toolgate_domain::normalize_namespace(&provider.into()), params);
        self
    }

    pub fn with_breaker_scope(mut self, scope: BreakerScope) -> Self {
        self.breaker_scope = scope;
        self
    }

    pub fn with_pool(mut self, pool: PoolParams) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_token(mut self, token: TokenParams) -> Self {
        self.token = token;
        self
    }

    /// Breaker parameters for `provider`, falling back to the defaults.
    pub fn breaker_for(&self, provider: &str) -> &BreakerParams {
        self.breaker_overrides
            .get(&toolgate_domain::normalize_namespace(provider))
            .unwrap_or(&self.breaker)
    }
}
