//! Circuit breaker registry
//!
//! Hands out one shared [`CircuitBreaker`] per provider (or per connection,
//! depending on [`BreakerScope`]). Breakers are created lazily on first use.

use super::circuit_breaker::{BreakerSnapshot, CircuitBreaker};
use crate::config::{BreakerScope, IsolationParams};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use toolgate_domain::{ConnectionId, normalize_namespace};
use tracing::debug;

pub struct CircuitBreakerRegistry {
    params: IsolationParams,
    breakers: Mutex<HashMap<String, CircuitBreaker>>,
}

impl CircuitBreakerRegistry {
    pub fn new(params: IsolationParams) -> Self {
        Self {
            params,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CircuitBreaker>> {
        self.breakers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn scope(&self) -> BreakerScope {
        self.params.breaker_scope
    }

    /// Registry key of the breaker guarding `provider` (and `connection_id`
    /// when breakers are scoped per connection).
    pub fn key_for(&self, provider: &str, connection_id: Option<&ConnectionId>) -> String {
        let namespace = normalize_namespace(provider);
        match (self.params.breaker_scope, connection_id) {
            (BreakerScope::Connection, Some(id)) => format!("{namespace}/{id}"),
            _ => namespace,
        }
    }

    /// Breaker for a call to `provider`, created on first use.
    pub fn breaker_for(&self, provider: &str, connection_id: Option<&ConnectionId>) -> CircuitBreaker {
        let key = self.key_for(provider, connection_id);
        let mut breakers = self.lock();
        breakers
            .entry(key)
            .or_insert_with_key(|key| {
                debug!(breaker = %key, "Creating circuit breaker");
                CircuitBreaker::new(key.clone(), self.params.breaker_for(provider).clone())
            })
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<CircuitBreaker> {
        self.lock().get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<CircuitBreaker> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let breakers: Vec<CircuitBreaker> = self.lock().values().cloned().collect();
        let mut snapshots: Vec<_> = breakers.iter().map(CircuitBreaker::snapshot).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn reset_all(&self) {
        let breakers: Vec<CircuitBreaker> = self.lock().values().cloned().collect();
        for breaker in breakers {
            breaker.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BreakerParams;
    use crate::resilience::CircuitState;

    #[test]
    fn test_provider_scope_shares_breaker_across_connections() {
        let registry = CircuitBreakerRegistry::new(IsolationParams::default());

        let a = registry.breaker_for("Notion", Some(&ConnectionId::new("conn-a")));
        let b = registry.breaker_for("notion", Some(&ConnectionId::new("conn-b")));

        assert_eq!(a.name(), "notion");
        assert_eq!(b.name(), "notion");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_connection_scope_separates_breakers() {
        let registry = CircuitBreakerRegistry::new(
            IsolationParams::default().with_breaker_scope(BreakerScope::Connection),
        );

        let a = registry.breaker_for("notion", Some(&ConnectionId::new("conn-a")));
        let b = registry.breaker_for("notion", Some(&ConnectionId::new("conn-b")));
        let anonymous = registry.breaker_for("notion", None);

        assert_eq!(a.name(), "notion/conn-a");
        assert_eq!(b.name(), "notion/conn-b");
        assert_eq!(anonymous.name(), "notion");
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breakers_share_state_and_use_overrides() {
        let params = IsolationParams::default()
            .with_breaker_override("github", BreakerParams::default().with_failure_threshold(1));
        let registry = CircuitBreakerRegistry::new(params);

        let breaker = registry.breaker_for("github", None);
        assert_eq!(breaker.params().failure_threshold, 1);
        assert_eq!(registry.breaker_for("slack", None).params().failure_threshold, 5);

        let _ = breaker.execute(|| async { Err::<(), _>("boom") }).await;
        assert_eq!(registry.breaker_for("github", None).state(), CircuitState::Open);

        let snapshots = registry.snapshots();
        let names: Vec<_> = snapshots.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["github", "slack"]);

        registry.reset_all();
        assert_eq!(registry.get("github").unwrap().state(), CircuitState::Closed);
    }
}
