//! Invoke Tool use case.
//!
//! Runs one tool call against a tenant's connection:
//!
//! 1. Isolation checks ([`execute_tool_with_isolation`]): namespace, owning
//!    organization and routing. Failures are never retried.
//! 2. Connection must be enabled.
//! 3. A pooled client is acquired (built through [`ProviderClientFactory`] on
//!    a miss).
//! 4. The remote operation runs behind the provider's circuit breaker, with
//!    the token refreshed first when it is about to expire.

use crate::credentials::RefreshError;
use crate::pool::{AcquireRequest, CallError, ClientPool};
use crate::ports::provider_client::{ClientFactoryError, ProviderClientFactory};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use toolgate_domain::{
    ConnectionId, IsolatedToolCall, IsolationError, OrganizationId, ToolRequest,
    execute_tool_with_isolation,
};
use tracing::{debug, info, warn};

/// Errors that can occur while invoking a tool.
#[derive(Error, Debug)]
pub enum InvokeToolError<E> {
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    #[error("connection disabled: connection_id={connection_id} provider={provider}")]
    ConnectionDisabled {
        connection_id: ConnectionId,
        provider: String,
    },

    #[error("Client unavailable: {0}")]
    ClientUnavailable(#[source] ClientFactoryError),

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

impl<E> InvokeToolError<E> {
    /// The request itself is wrong; retrying it unchanged cannot succeed.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self,
            InvokeToolError::Isolation(_) | InvokeToolError::ConnectionDisabled { .. }
        )
    }

    /// The provider or its token endpoint is failing; the request itself was
    /// acceptable.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            InvokeToolError::BreakerOpen { .. }
                | InvokeToolError::TimedOut { .. }
                | InvokeToolError::Aborted { .. }
                | InvokeToolError::CredentialRefreshFailed(_)
                | InvokeToolError::Remote(_)
        )
    }

    pub fn isolation(&self) -> Option<&IsolationError> {
        match self {
            InvokeToolError::Isolation(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<CallError<E>> for InvokeToolError<E> {
    fn from(e: CallError<E>) -> Self {
        match e {
            CallError::BreakerOpen { breaker, retry_after } => {
                InvokeToolError::BreakerOpen { breaker, retry_after }
            }
            CallError::TimedOut { breaker, timeout } => InvokeToolError::TimedOut { breaker, timeout },
            CallError::Aborted { breaker } => InvokeToolError::Aborted { breaker },
            CallError::CredentialRefreshFailed(e) => InvokeToolError::CredentialRefreshFailed(e),
            CallError::Remote(e) => InvokeToolError::Remote(e),
        }
    }
}

/// Input for the [`InvokeToolUseCase`].
#[derive(Debug, Clone)]
pub struct InvokeToolInput {
    pub request: ToolRequest,
    /// Namespace of the execution path the router chose.
    pub target_namespace: String,
    /// Organization of the authenticated caller.
    pub caller_organization_id: OrganizationId,
}

impl InvokeToolInput {
    pub fn new(
        request: ToolRequest,
        target_namespace: impl Into<String>,
        caller_organization_id: OrganizationId,
    ) -> Self {
        Self {
            request,
            target_namespace: target_namespace.into(),
            caller_organization_id,
        }
    }
}

/// Output of a successful invocation.
#[derive(Debug, Clone)]
pub struct InvokeToolOutput<T> {
    pub call: IsolatedToolCall,
    pub value: T,
}

/// Use case for invoking a provider tool with isolation and resilience.
pub struct InvokeToolUseCase<F: ProviderClientFactory + 'static> {
    factory: Arc<F>,
    pool: ClientPool<F::Client>,
}

impl<F: ProviderClientFactory + 'static> Clone for InvokeToolUseCase<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            pool: self.pool.clone(),
        }
    }
}

impl<F: ProviderClientFactory + 'static> InvokeToolUseCase<F> {
    pub fn new(factory: Arc<F>, pool: ClientPool<F::Client>) -> Self {
        Self { factory, pool }
    }

    pub fn pool(&self) -> &ClientPool<F::Client> {
        &self.pool
    }

    /// Run the isolation checks and the enabled check, without any I/O.
    pub fn resolve<E>(&self, input: &InvokeToolInput) -> Result<IsolatedToolCall, InvokeToolError<E>> {
        let call = execute_tool_with_isolation(
            &input.request,
            &input.target_namespace,
            &input.caller_organization_id,
        )
        .inspect_err(|e| {
            if e.is_security_violation() {
                warn!(
                    violation = %e.violation(),
                    caller_organization = %input.caller_organization_id,
                    "Blocked cross-tenant tool call: {}",
                    e
                );
            } else {
                debug!(violation = %e.violation(), "Rejected tool call: {}", e);
            }
        })?;

        let connection = &input.request.connection;
        if !connection.is_enabled() {
            self.pool.invalidate_connection(connection.id());
            return Err(InvokeToolError::ConnectionDisabled {
                connection_id: connection.id().clone(),
                provider: call.provider.clone(),
            });
        }

        Ok(call)
    }

    /// Execute `operation` for the resolved call.
    ///
    /// `operation` receives the pooled client and the isolated call; it does
    /// the provider-specific request.
    pub async fn execute<T, E, Op, Fut>(
        &self,
        input: InvokeToolInput,
        operation: Op,
    ) -> Result<InvokeToolOutput<T>, InvokeToolError<E>>
    where
        Op: FnOnce(Arc<F::Client>, IsolatedToolCall) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let call = self.resolve(&input)?;

        let factory = Arc::clone(&self.factory);
        let provider = call.provider.clone();
        let pooled = self
            .pool
            .acquire(AcquireRequest::for_connection(&input.request.connection), move |lease| async move {
                factory.create_client(&provider, lease).await
            })
            .await
            .map_err(InvokeToolError::ClientUnavailable)?;

        let op_call = call.clone();
        let value = pooled
            .call(move |client| operation(client, op_call))
            .await
            .inspect_err(|e| warn!(tool = %call.resolved_tool_name, connection_id = %call.connection_id, "Tool call failed: {}", DisplayCallError(e)))?;

        info!(
            tool = %call.resolved_tool_name,
            provider = %call.provider,
            connection_id = %call.connection_id,
            "Tool call completed"
        );
        Ok(InvokeToolOutput { call, value })
    }
}

/// Renders the resilience-layer part of a [`CallError`] without requiring
/// the remote error to be displayable.
struct DisplayCallError<'a, E>(&'a CallError<E>);

impl<E> std::fmt::Display for DisplayCallError<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            CallError::BreakerOpen { breaker, .. } => write!(f, "circuit open ({breaker})"),
            CallError::TimedOut { breaker, timeout } => {
                write!(f, "timed out after {}ms ({breaker})", timeout.as_millis())
            }
            CallError::Aborted { breaker } => write!(f, "aborted ({breaker})"),
            CallError::CredentialRefreshFailed(e) => write!(f, "{e}"),
            CallError::Remote(_) => f.write_str("remote error"),
        }
    }
}
