//! Provider client pool
//!
//! Reuses live API clients across calls. Entries are keyed by
//! `(provider, organization, credential fingerprint)`, so two organizations
//! never share a client even when they present identical credentials.
//!
//! Calls made through a [`PooledClient`] go through the provider's circuit
//! breaker first and the token guard second. When the guard refreshes a token
//! the entry is retired: outstanding handles keep their client, and the next
//! acquire with the refreshed credentials builds a new one.
//!
//! Breakers come from a [`CircuitBreakerRegistry`] shared with the host, so
//! every pool in the process sees the same breaker for a provider.

use super::fingerprint::credential_fingerprint;
use crate::config::PoolParams;
use crate::credentials::{CredentialLease, Freshness, RefreshError, TokenGuard};
use crate::resilience::{BreakerError, CircuitBreakerRegistry};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use toolgate_domain::{Connection, ConnectionId, Credentials, OrganizationId, normalize_namespace};
use tracing::{debug, info};

/// Identity of a pooled client.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    pub provider: String,
    pub organization_id: OrganizationId,
    pub fingerprint: String,
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short: String = self.fingerprint.chars().take(12).collect();
        write!(f, "{}:{}:{}", self.provider, self.organization_id, short)
    }
}

/// What the caller wants a client for.
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub provider: String,
    pub organization_id: OrganizationId,
    pub connection_id: Option<ConnectionId>,
    pub credentials: Option<Credentials>,
}

impl AcquireRequest {
    pub fn new(provider: impl Into<String>, organization_id: OrganizationId) -> Self {
        Self {
            provider: provider.into(),
            organization_id,
            connection_id: None,
            credentials: None,
        }
    }

    /// Request for a stored connection: its provider, owner and credentials.
    pub fn for_connection(connection: &Connection) -> Self {
        Self {
            provider: connection.provider().to_string(),
            organization_id: connection.organization_id().clone(),
            connection_id: Some(connection.id().clone()),
            credentials: connection.credentials().cloned(),
        }
    }

    pub fn with_connection_id(mut self, connection_id: ConnectionId) -> Self {
        self.connection_id = Some(connection_id);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn key(&self) -> PoolKey {
        PoolKey {
            provider: normalize_namespace(&self.provider),
            organization_id: self.organization_id.clone(),
            fingerprint: credential_fingerprint(self.credentials.as_ref()),
        }
    }
}

/// Failure of a call made through a [`PooledClient`].
#[derive(Error, Debug)]
pub enum CallError<E> {
    #[error("provider unavailable, circuit open: breaker={breaker} retry_after_ms={}", retry_after.as_millis())]
    BreakerOpen { breaker: String, retry_after: Duration },

    #[error("provider call timed out: breaker={breaker} timeout_ms={}", timeout.as_millis())]
    TimedOut { breaker: String, timeout: Duration },

    #[error("provider call aborted: breaker={breaker}")]
    Aborted { breaker: String },

    #[error(transparent)]
    CredentialRefreshFailed(RefreshError),

    #[error(transparent)]
    Remote(E),
}

/// Pool counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Clients currently pooled.
    pub entries: usize,
    /// Pooled clients with at least one outstanding handle.
    pub in_use: usize,
    pub created: u64,
    pub reused: u64,
    pub evicted: u64,
    /// Clients dropped from the pool because their token was refreshed.
    pub retired_on_refresh: u64,
}

struct PoolEntry<C> {
    id: u64,
    client: Arc<C>,
    lease: Arc<CredentialLease>,
    ref_count: usize,
    last_used: Instant,
}

impl<C> PoolEntry<C> {
    fn is_idle(&self, now: Instant, idle_timeout: Duration) -> bool {
        self.ref_count == 0 && now.saturating_duration_since(self.last_used) >= idle_timeout
    }
}

struct PoolState<C> {
    entries: HashMap<PoolKey, PoolEntry<C>>,
}

impl<C> PoolState<C> {
    /// Take a new reference on the entry under `key`.
    fn checkout(&mut self, key: &PoolKey) -> Option<(u64, Arc<C>, Arc<CredentialLease>)> {
        let entry = self.entries.get_mut(key)?;
        entry.ref_count += 1;
        entry.last_used = Instant::now();
        Some((entry.id, Arc::clone(&entry.client), Arc::clone(&entry.lease)))
    }
}

struct PoolShared<C> {
    state: Mutex<PoolState<C>>,
    registry: Arc<CircuitBreakerRegistry>,
    guard: TokenGuard,
    params: PoolParams,
    next_id: AtomicU64,
    created: AtomicU64,
    reused: AtomicU64,
    evicted: AtomicU64,
    retired_on_refresh: AtomicU64,
}

impl<C> PoolShared<C> {
    fn lock(&self) -> MutexGuard<'_, PoolState<C>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self, key: &PoolKey, entry_id: u64) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(key)
            && entry.id == entry_id
        {
            entry.ref_count = entry.ref_count.saturating_sub(1);
            entry.last_used = Instant::now();
        }
    }

    /// Drop the entry built for the pre-refresh credential.
    fn retire_refreshed(&self, key: &PoolKey, entry_id: u64) {
        let mut state = self.lock();
        if state.entries.get(key).is_some_and(|entry| entry.id == entry_id) {
            state.entries.remove(key);
            self.retired_on_refresh.fetch_add(1, Ordering::Relaxed);
            info!(key = %key, "Retired pooled client after credential refresh");
        }
    }

    fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut state = self.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| !entry.is_idle(now, self.params.idle_timeout));
        let evicted = before - state.entries.len();
        if evicted > 0 {
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, remaining = state.entries.len(), "Evicted idle pooled clients");
        }
        evicted
    }
}

/// Pool of provider clients of type `C`.
pub struct ClientPool<C> {
    shared: Arc<PoolShared<C>>,
}

impl<C> Clone for ClientPool<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Send + Sync + 'static> ClientPool<C> {
    /// Build a pool whose calls go through breakers from `registry`.
    pub fn new(registry: Arc<CircuitBreakerRegistry>, params: PoolParams, guard: TokenGuard) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                state: Mutex::new(PoolState {
                    entries: HashMap::new(),
                }),
                registry,
                guard,
                params,
                next_id: AtomicU64::new(1),
                created: AtomicU64::new(0),
                reused: AtomicU64::new(0),
                evicted: AtomicU64::new(0),
                retired_on_refresh: AtomicU64::new(0),
            }),
        }
    }

    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.shared.registry
    }

    fn handle(&self, key: PoolKey, (entry_id, client, lease): (u64, Arc<C>, Arc<CredentialLease>)) -> PooledClient<C> {
        PooledClient {
            shared: Arc::clone(&self.shared),
            key,
            entry_id,
            client,
            lease,
        }
    }

    /// Get the pooled client for `request`, building one with `create_client`
    /// on a miss.
    ///
    /// Construction runs without holding the pool lock. If another caller
    /// finished building the same key first, its client wins and the one just
    /// built is dropped.
    pub async fn acquire<F, Fut, E>(&self, request: AcquireRequest, create_client: F) -> Result<PooledClient<C>, E>
    where
        F: FnOnce(Arc<CredentialLease>) -> Fut,
        Fut: Future<Output = Result<C, E>>,
    {
        let key = request.key();
        let hit = self.shared.lock().checkout(&key);
        if let Some(hit) = hit {
            self.shared.reused.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "Reusing pooled client");
            return Ok(self.handle(key, hit));
        }

        let lease = Arc::new(CredentialLease::new(
            request.connection_id.clone(),
            request.provider.clone(),
            request.credentials.clone(),
        ));
        let client = Arc::new(create_client(Arc::clone(&lease)).await?);

        let checked_out = {
            let mut state = self.shared.lock();
            match state.checkout(&key) {
                Some(existing) => Err(existing),
                None => {
                    let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
                    state.entries.insert(
                        key.clone(),
                        PoolEntry {
                            id,
                            client: Arc::clone(&client),
                            lease: Arc::clone(&lease),
                            ref_count: 1,
                            last_used: Instant::now(),
                        },
                    );
                    Ok(id)
                }
            }
        };

        match checked_out {
            Ok(id) => {
                self.shared.created.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Created pooled client");
                Ok(self.handle(key, (id, client, lease)))
            }
            Err(existing) => {
                self.shared.reused.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Discarding duplicate client built concurrently");
                Ok(self.handle(key, existing))
            }
        }
    }

    /// Remove unreferenced clients idle for longer than the idle timeout.
    pub fn evict_idle(&self) -> usize {
        self.shared.evict_idle()
    }

    /// Run [`Self::evict_idle`] every `reap_interval` until the pool is dropped.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let weak: Weak<PoolShared<C>> = Arc::downgrade(&self.shared);
        let period = self.shared.params.reap_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(shared) => {
                        shared.evict_idle();
                    }
                    None => break,
                }
            }
        })
    }

    /// Drop every client built for `connection_id`, in use or not.
    ///
    /// Outstanding handles keep working; their client is simply not reused.
    pub fn invalidate_connection(&self, connection_id: &ConnectionId) -> usize {
        let mut state = self.shared.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| entry.lease.connection_id() != Some(connection_id));
        let removed = before - state.entries.len();
        if removed > 0 {
            info!(connection_id = %connection_id, removed, "Invalidated pooled clients for connection");
        }
        removed
    }

    /// Drop the client pooled under `key`, if any.
    pub fn retire(&self, key: &PoolKey) -> bool {
        let removed = self.shared.lock().entries.remove(key).is_some();
        if removed {
            debug!(key = %key, "Retired pooled client");
        }
        removed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.lock();
        PoolStats {
            entries: state.entries.len(),
            in_use: state.entries.values().filter(|e| e.ref_count > 0).count(),
            created: self.shared.created.load(Ordering::Relaxed),
            reused: self.shared.reused.load(Ordering::Relaxed),
            evicted: self.shared.evicted.load(Ordering::Relaxed),
            retired_on_refresh: self.shared.retired_on_refresh.load(Ordering::Relaxed),
        }
    }
}

/// Checked-out client. Returned to the pool on drop.
pub struct PooledClient<C> {
    shared: Arc<PoolShared<C>>,
    key: PoolKey,
    entry_id: u64,
    client: Arc<C>,
    lease: Arc<CredentialLease>,
}

impl<C> PooledClient<C> {
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn lease(&self) -> &Arc<CredentialLease> {
        &self.lease
    }

    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Return the client to the pool now rather than at end of scope.
    pub fn release(self) {}
}

impl<C: Send + Sync + 'static> PooledClient<C> {
    /// Run `operation` against the client: breaker admission first, then token
    /// freshness, then the remote call.
    ///
    /// Credential refresh failures do not count against the breaker.
    pub async fn call<T, E, F, Fut>(&self, operation: F) -> Result<T, CallError<E>>
    where
        F: FnOnce(Arc<C>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let breaker = self
            .shared
            .registry
            .breaker_for(self.lease.provider(), self.lease.connection_id());

        let shared = Arc::clone(&self.shared);
        let lease = Arc::clone(&self.lease);
        let client = Arc::clone(&self.client);
        let key = self.key.clone();
        let entry_id = self.entry_id;

        let result = breaker
            .execute_classified(
                move || async move {
                    let freshness = shared
                        .guard
                        .ensure_fresh(&lease)
                        .await
                        .map_err(GuardedFailure::Refresh)?;
                    if freshness == Freshness::Refreshed {
                        shared.retire_refreshed(&key, entry_id);
                    }
                    operation(client).await.map_err(GuardedFailure::Remote)
                },
                |failure: &GuardedFailure<E>| matches!(failure, GuardedFailure::Remote(_)),
            )
            .await;

        result.map_err(|e| match e {
            BreakerError::Open { name, retry_after } => CallError::BreakerOpen {
                breaker: name,
                retry_after,
            },
            BreakerError::TimedOut { name, timeout } => CallError::TimedOut {
                breaker: name,
                timeout,
            },
            BreakerError::Aborted { name } => CallError::Aborted { breaker: name },
            BreakerError::Operation(GuardedFailure::Refresh(e)) => CallError::CredentialRefreshFailed(e),
            BreakerError::Operation(GuardedFailure::Remote(e)) => CallError::Remote(e),
        })
    }
}

enum GuardedFailure<E> {
    Refresh(RefreshError),
    Remote(E),
}

impl<C> Drop for PooledClient<C> {
    fn drop(&mut self) {
        self.shared.release(&self.key, self.entry_id);
    }
}

impl<C> std::fmt::Debug for PooledClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledClient")
            .field("key", &self.key.to_string())
            .field("entry_id", &self.entry_id)
            .finish()
    }
}
