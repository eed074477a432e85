//! Token freshness guard
//!
//! Refreshes expiring OAuth tokens before a remote call goes out, writes the
//! refreshed credentials back to the connection store and swaps them into the
//! shared [`CredentialLease`].

use super::lease::CredentialLease;
use crate::config::TokenParams;
use crate::ports::connection_store::ConnectionStore;
use crate::ports::token_exchanger::{ExchangeError, TokenExchanger};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use toolgate_domain::{ConnectionId, Credentials};
use tracing::{debug, info, warn};

/// Refresh failures. Both variants fail the call; neither is a provider outage.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("credential refresh failed: connection_id={connection_id} provider={provider} reason=no refresh token")]
    MissingRefreshToken {
        connection_id: ConnectionId,
        provider: String,
    },

    #[error("credential refresh failed: connection_id={connection_id} provider={provider}")]
    ExchangeFailed {
        connection_id: ConnectionId,
        provider: String,
        #[source]
        source: ExchangeError,
    },
}

impl RefreshError {
    pub fn connection_id(&self) -> &ConnectionId {
        match self {
            RefreshError::MissingRefreshToken { connection_id, .. }
            | RefreshError::ExchangeFailed { connection_id, .. } => connection_id,
        }
    }
}

/// What [`TokenGuard::ensure_fresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Credentials were usable as-is.
    Fresh,
    /// Credentials were replaced by a refresh.
    Refreshed,
}

pub struct TokenGuard {
    exchanger: Arc<dyn TokenExchanger>,
    store: Arc<dyn ConnectionStore>,
    params: TokenParams,
    flights: Mutex<HashMap<ConnectionId, Arc<tokio::sync::Mutex<()>>>>,
}

impl TokenGuard {
    pub fn new(
        exchanger: Arc<dyn TokenExchanger>,
        store: Arc<dyn ConnectionStore>,
        params: TokenParams,
    ) -> Self {
        Self {
            exchanger,
            store,
            params,
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub fn params(&self) -> &TokenParams {
        &self.params
    }

    fn skew(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.params.safety_skew).unwrap_or_else(|_| chrono::Duration::zero())
    }

    fn needs_refresh(&self, credentials: &Credentials) -> bool {
        credentials.needs_refresh(Utc::now(), self.skew())
    }

    fn flight(&self, connection_id: &ConnectionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(flights.entry(connection_id.clone()).or_default())
    }

    fn prune_flights(&self) {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        flights.retain(|_, flight| Arc::strong_count(flight) > 1);
    }

    /// Make sure the lease holds a usable token.
    ///
    /// Leases without a connection, API keys and tokens without an expiry are
    /// left untouched. A failed write-back to the store is logged and does not
    /// fail the call: the refreshed token is already in the lease.
    pub async fn ensure_fresh(&self, lease: &CredentialLease) -> Result<Freshness, RefreshError> {
        let Some(connection_id) = lease.connection_id() else {
            return Ok(Freshness::Fresh);
        };
        match lease.current() {
            Some(credentials) if self.needs_refresh(&credentials) => {}
            _ => return Ok(Freshness::Fresh),
        }

        if !self.params.single_flight {
            return self.refresh(connection_id, lease).await;
        }

        let flight = self.flight(connection_id);
        let result = {
            let _turn = flight.lock().await;
            self.refresh(connection_id, lease).await
        };
        drop(flight);
        self.prune_flights();
        result
    }

    async fn refresh(
        &self,
        connection_id: &ConnectionId,
        lease: &CredentialLease,
    ) -> Result<Freshness, RefreshError> {
        // Another caller may have refreshed while we waited for our turn.
        let Some(mut credentials) = lease.current() else {
            return Ok(Freshness::Fresh);
        };
        if !self.needs_refresh(&credentials) {
            debug!(connection_id = %connection_id, "Token already refreshed by concurrent caller");
            return Ok(Freshness::Fresh);
        }

        let provider = lease.provider().to_string();
        let refresh_token = credentials
            .refresh_token()
            .ok_or_else(|| RefreshError::MissingRefreshToken {
                connection_id: connection_id.clone(),
                provider: provider.clone(),
            })?
            .to_string();

        debug!(connection_id = %connection_id, provider = %provider, "Refreshing access token");
        let grant = self
            .exchanger
            .refresh(&provider, &refresh_token)
            .await
            .map_err(|source| {
                warn!(connection_id = %connection_id, provider = %provider, error = %source, "Token refresh failed");
                RefreshError::ExchangeFailed {
                    connection_id: connection_id.clone(),
                    provider: provider.clone(),
                    source,
                }
            })?;

        let expires_at = match grant.expires_in {
            Some(lifetime) => Some(
                chrono::Duration::from_std(lifetime)
                    .ok()
                    .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
                    .ok_or_else(|| RefreshError::ExchangeFailed {
                        connection_id: connection_id.clone(),
                        provider: provider.clone(),
                        source: ExchangeError::InvalidResponse(format!(
                            "expires_in out of range: {}s",
                            lifetime.as_secs()
                        )),
                    })?,
            ),
            None => None,
        };
        credentials.apply_refresh(grant.access_token, grant.refresh_token, expires_at);
        lease.replace(credentials.clone());

        if let Err(e) = self.store.save_credentials(connection_id, &credentials).await {
            warn!(
                connection_id = %connection_id,
                provider = %provider,
                error = %e,
                "Failed to persist refreshed credentials"
            );
        }

        info!(
            connection_id = %connection_id,
            provider = %provider,
            expires_at = ?expires_at,
            "Access token refreshed"
        );
        Ok(Freshness::Refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::connection_store::StoreError;
    use crate::ports::token_exchanger::TokenGrant;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use toolgate_domain::{Connection, OrganizationId};

    // ==================== Mock Implementations ====================

    struct MockExchanger {
        calls: AtomicUsize,
        grant: Option<TokenGrant>,
        delay: Duration,
    }

    impl MockExchanger {
        fn granting(grant: TokenGrant) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                grant: Some(grant),
                delay: Duration::ZERO,
            }
        }

        fn rejecting() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                grant: None,
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl TokenExchanger for MockExchanger {
        async fn refresh(&self, _provider: &str, _refresh_token: &str) -> Result<TokenGrant, ExchangeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.grant.clone().ok_or(ExchangeError::Rejected {
                status: 400,
                message: "invalid_grant".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<(ConnectionId, Credentials)>>,
        fail_saves: bool,
    }

    #[async_trait]
    impl ConnectionStore for RecordingStore {
        async fn find(&self, _connection_id: &ConnectionId) -> Result<Option<Connection>, StoreError> {
            Ok(None)
        }

        async fn list_for_organization(
            &self,
            _organization_id: &OrganizationId,
        ) -> Result<Vec<Connection>, StoreError> {
            Ok(Vec::new())
        }

        async fn save_credentials(
            &self,
            connection_id: &ConnectionId,
            credentials: &Credentials,
        ) -> Result<(), StoreError> {
            if self.fail_saves {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.saved
                .lock()
                .unwrap()
                .push((connection_id.clone(), credentials.clone()));
            Ok(())
        }
    }

    fn guard(exchanger: Arc<MockExchanger>, store: Arc<RecordingStore>, single_flight: bool) -> TokenGuard {
        TokenGuard::new(
            exchanger,
            store,
            TokenParams {
                safety_skew: Duration::from_secs(60),
                single_flight,
            },
        )
    }

    fn expiring_lease(seconds_left: i64) -> CredentialLease {
        CredentialLease::new(
            Some(ConnectionId::new("conn-1")),
            "notion",
            Some(
                Credentials::oauth("old-access")
                    .with_refresh_token("refresh-1")
                    .with_expires_at(Utc::now() + chrono::Duration::seconds(seconds_left)),
            ),
        )
    }

    #[tokio::test]
    async fn test_fresh_token_is_not_refreshed() {
        let exchanger = Arc::new(MockExchanger::granting(TokenGrant::new("new-access")));
        let store = Arc::new(RecordingStore::default());
        let guard = guard(Arc::clone(&exchanger), Arc::clone(&store), false);

        let lease = expiring_lease(3600);
        assert_eq!(guard.ensure_fresh(&lease).await.unwrap(), Freshness::Fresh);
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 0);
        assert_eq!(lease.secret().as_deref(), Some("old-access"));
    }

    #[tokio::test]
    async fn test_token_inside_skew_is_refreshed_and_persisted() {
        let exchanger = Arc::new(MockExchanger::granting(
            TokenGrant::new("new-access").with_expires_in(Duration::from_secs(3600)),
        ));
        let store = Arc::new(RecordingStore::default());
        let guard = guard(Arc::clone(&exchanger), Arc::clone(&store), false);

        let lease = expiring_lease(30);
        assert_eq!(guard.ensure_fresh(&lease).await.unwrap(), Freshness::Refreshed);

        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);
        assert_eq!(lease.secret().as_deref(), Some("new-access"));
        let current = lease.current().unwrap();
        // provider did not rotate the refresh token
        assert_eq!(current.refresh_token(), Some("refresh-1"));
        assert!(current.expires_at().unwrap() > Utc::now() + chrono::Duration::seconds(3000));

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, ConnectionId::new("conn-1"));
        assert_eq!(saved[0].1, current);
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_is_kept() {
        let exchanger = Arc::new(MockExchanger::granting(
            TokenGrant::new("new-access").with_refresh_token("refresh-2"),
        ));
        let guard = guard(exchanger, Arc::new(RecordingStore::default()), false);

        let lease = expiring_lease(-10);
        guard.ensure_fresh(&lease).await.unwrap();
        let current = lease.current().unwrap();
        assert_eq!(current.refresh_token(), Some("refresh-2"));
        assert_eq!(current.expires_at(), None);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails() {
        let exchanger = Arc::new(MockExchanger::granting(TokenGrant::new("new-access")));
        let guard = guard(Arc::clone(&exchanger), Arc::new(RecordingStore::default()), false);

        let lease = CredentialLease::new(
            Some(ConnectionId::new("conn-9")),
            "github",
            Some(Credentials::oauth("old").with_expires_at(Utc::now())),
        );
        let err = guard.ensure_fresh(&lease).await.unwrap_err();
        assert!(matches!(err, RefreshError::MissingRefreshToken { .. }));
        assert_eq!(err.connection_id(), &ConnectionId::new("conn-9"));
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exchange_failure_leaves_lease_untouched() {
        let store = Arc::new(RecordingStore::default());
        let guard = guard(Arc::new(MockExchanger::rejecting()), Arc::clone(&store), false);

        let lease = expiring_lease(0);
        let err = guard.ensure_fresh(&lease).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "credential refresh failed: connection_id=conn-1 provider=notion"
        );
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(lease.secret().as_deref(), Some("old-access"));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_rejected_without_panicking() {
        let exchanger = Arc::new(MockExchanger::granting(
            TokenGrant::new("new-access").with_expires_in(Duration::from_secs(9_000_000_000_000_000)),
        ));
        let store = Arc::new(RecordingStore::default());
        let guard = guard(exchanger, Arc::clone(&store), false);

        let lease = expiring_lease(0);
        let err = guard.ensure_fresh(&lease).await.unwrap_err();

        match err {
            RefreshError::ExchangeFailed { source, .. } => {
                assert!(matches!(source, ExchangeError::InvalidResponse(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(lease.secret().as_deref(), Some("old-access"));
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_call() {
        let store = Arc::new(RecordingStore {
            fail_saves: true,
            ..Default::default()
        });
        let guard = guard(
            Arc::new(MockExchanger::granting(TokenGrant::new("new-access"))),
            store,
            false,
        );

        let lease = expiring_lease(0);
        assert_eq!(guard.ensure_fresh(&lease).await.unwrap(), Freshness::Refreshed);
        assert_eq!(lease.secret().as_deref(), Some("new-access"));
    }

    #[tokio::test]
    async fn test_api_keys_and_detached_leases_are_skipped() {
        let exchanger = Arc::new(MockExchanger::rejecting());
        let guard = guard(Arc::clone(&exchanger), Arc::new(RecordingStore::default()), false);

        let api_key = CredentialLease::new(
            Some(ConnectionId::new("conn-2")),
            "linear",
            Some(Credentials::api_key("lin_123")),
        );
        let detached = CredentialLease::detached(
            "notion",
            Credentials::oauth("tok").with_refresh_token("r").with_expires_at(Utc::now()),
        );

        assert_eq!(guard.ensure_fresh(&api_key).await.unwrap(), Freshness::Fresh);
        assert_eq!(guard.ensure_fresh(&detached).await.unwrap(), Freshness::Fresh);
        assert_eq!(guard.ensure_fresh(&CredentialLease::anonymous("x")).await.unwrap(), Freshness::Fresh);
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_flight_refreshes_once() {
        let exchanger = Arc::new(
            MockExchanger::granting(TokenGrant::new("new-access").with_expires_in(Duration::from_secs(3600)))
                .with_delay(Duration::from_millis(50)),
        );
        let guard = guard(Arc::clone(&exchanger), Arc::new(RecordingStore::default()), true);
        let lease = expiring_lease(0);

        let (a, b) = tokio::join!(guard.ensure_fresh(&lease), guard.ensure_fresh(&lease));
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|f| *f == Freshness::Refreshed);

        assert_eq!(outcomes, vec![Freshness::Fresh, Freshness::Refreshed]);
        assert_eq!(exchanger.calls.load(Ordering::SeqCst), 1);
        assert!(guard.flights.lock().unwrap().is_empty());
    }
}
