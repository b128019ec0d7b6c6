//! Single-flight coordination of token refresh
//!
//! At most one refresh round trip is in flight at any time. The first caller
//! after idle starts a cycle; every caller that arrives while the cycle is
//! active joins it instead of issuing a second request. Each caller waits on
//! its own channel, settled exactly once with the cycle's outcome.
//!
//! The cycle itself runs as a detached task, so it settles its waiters even
//! when the caller that started it is cancelled mid-await. If the task
//! unwinds instead of finishing, a drop guard fails the waiters rather than
//! leaving them queued.

use crate::error::{AuthError, AuthResult};
use crate::events::{AuthEvent, AuthEventBus};
use crate::store::TokenStore;
use async_trait::async_trait;
use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Default bound on a single refresh round trip
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

/// Tokens returned by a successful refresh call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    /// The new access token
    pub access_token: String,
    /// Rotated refresh token; `None` means the server kept the old one
    pub refresh_token: Option<String>,
}

/// Transport that exchanges a refresh token for new credentials
#[async_trait]
pub trait RefreshTransport: Send + Sync {
    /// Perform one refresh round trip
    async fn refresh(&self, refresh_token: &str) -> AuthResult<RefreshedTokens>;
}

type Waiter = oneshot::Sender<AuthResult<String>>;

enum CycleState {
    /// No refresh in flight
    Idle,
    /// A cycle is running; queued callers in arrival order
    Refreshing(Vec<Waiter>),
}

/// Single-flight refresh coordinator
///
/// Cheap to clone; clones share the cycle state, the token store, and the
/// event bus. On failure the coordinator clears the stored credentials and
/// emits the matching [`AuthEvent`] before rejecting its callers.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    state: Mutex<CycleState>,
    store: TokenStore,
    events: AuthEventBus,
    transport: Arc<dyn RefreshTransport>,
    refresh_timeout: Duration,
}

impl RefreshCoordinator {
    /// Create a coordinator over the given store, bus, and transport
    pub fn new(
        store: TokenStore,
        events: AuthEventBus,
        transport: Arc<dyn RefreshTransport>,
    ) -> Self {
        Self::with_timeout(store, events, transport, DEFAULT_REFRESH_TIMEOUT)
    }

    /// Create a coordinator with a custom bound on the refresh round trip
    pub fn with_timeout(
        store: TokenStore,
        events: AuthEventBus,
        transport: Arc<dyn RefreshTransport>,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                state: Mutex::new(CycleState::Idle),
                store,
                events,
                transport,
                refresh_timeout,
            }),
        }
    }

    /// Obtain a fresh access token, starting a refresh cycle or joining the
    /// one already in flight
    ///
    /// Resolves once the cycle settles. Every caller joined to one cycle
    /// observes that cycle's outcome, never a later one's.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoRefreshToken`] when the store holds no refresh token
    /// (no network call is made), [`AuthError::Rejected`] when the server
    /// refused the refresh token, [`AuthError::Network`] when the round trip
    /// failed or timed out.
    pub async fn begin_or_join(&self) -> AuthResult<String> {
        let (tx, rx) = oneshot::channel();
        let is_leader = {
            let mut state = self.inner.state.lock().unwrap();
            match &mut *state {
                CycleState::Idle => {
                    *state = CycleState::Refreshing(vec![tx]);
                    true
                }
                CycleState::Refreshing(waiters) => {
                    waiters.push(tx);
                    false
                }
            }
        };

        if is_leader {
            let inner = Arc::clone(&self.inner);
            // Detached: the cycle settles even if every caller is cancelled.
            tokio::spawn(async move {
                let guard = CycleGuard::arm(Arc::clone(&inner));
                let outcome = inner.run_cycle().await;
                guard.finish(&outcome);
            });
        } else {
            debug!("joining refresh cycle already in flight");
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(AuthError::network("refresh cycle dropped before settling")),
        }
    }
}

impl CoordinatorInner {
    async fn run_cycle(&self) -> AuthResult<String> {
        let Some(refresh_token) = self.store.refresh_token().await else {
            info!("no refresh token, ending session");
            self.store.clear().await;
            self.events.emit(&AuthEvent::Logout {
                reason: Some("session expired".to_string()),
            });
            return Err(AuthError::NoRefreshToken);
        };

        debug!("refreshing access token");
        let result = match tokio::time::timeout(
            self.refresh_timeout,
            self.transport.refresh(&refresh_token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AuthError::network(format!(
                "refresh timed out after {:?}",
                self.refresh_timeout
            ))),
        };

        match result {
            Ok(tokens) => {
                match tokens.refresh_token {
                    Some(ref rotated) => self.store.set_tokens(&tokens.access_token, rotated).await,
                    None => self.store.set_access_token(&tokens.access_token).await,
                }
                debug!("refresh succeeded");
                Ok(tokens.access_token)
            }
            Err(error) => {
                warn!(error = %error, "refresh failed, clearing session");
                self.store.clear().await;
                self.events.emit(&AuthEvent::TokenRefreshFailed {
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Deliver the outcome to every waiter, oldest first, and return to idle
    fn settle(&self, outcome: &AuthResult<String>) {
        let waiters = {
            let mut state = self.state.lock().unwrap();
            match mem::replace(&mut *state, CycleState::Idle) {
                CycleState::Refreshing(waiters) => waiters,
                CycleState::Idle => Vec::new(),
            }
        };

        debug!(waiters = waiters.len(), "settling refresh cycle");
        for waiter in waiters {
            // A cancelled caller has dropped its receiver; nothing to do.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Settles the cycle with a failure if the leader task unwinds early
///
/// A panicking transport must not strand the state machine in `Refreshing`
/// with waiters that never resolve.
struct CycleGuard {
    inner: Arc<CoordinatorInner>,
    settled: bool,
}

impl CycleGuard {
    fn arm(inner: Arc<CoordinatorInner>) -> Self {
        Self {
            inner,
            settled: false,
        }
    }

    fn finish(mut self, outcome: &AuthResult<String>) {
        self.settled = true;
        self.inner.settle(outcome);
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if !self.settled {
            warn!("refresh cycle aborted, failing its waiters");
            let aborted = Err(AuthError::network("refresh cycle aborted before settling"));
            self.inner.settle(&aborted);
        }
    }
}
