//! Login session: who the user currently is.
//!
//! # State machine
//!
//! ```text
//!   Anonymous ──login()──▶ Authenticating ──ok──▶ Authenticated
//!       ▲                        │                     │
//!       │                        └──err──▶ Failed      │
//!       └─────────────── logout() ◀────────────────────┘
//! ```
//!
//! `Failed` reads exactly like `Anonymous`; it only remembers why the last
//! attempt did not work. There is no terminal state.
//!
//! [`SessionStore`] holds the state and the current identity, and is the
//! [`IdentityResolver`] the actor cache builds against. [`SessionController`]
//! drives it: it talks to the identity provider and resets the actor cache
//! whenever the identity changes.
//!
//! Every logout bumps an epoch. A provider answer that arrives for an older
//! epoch is thrown away, so a login cannot resurrect a session the user has
//! already left.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use candid::Principal;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::cache::ActorCache;
use crate::config::PortalConfig;
use crate::error::ClientError;
use crate::identity::{AuthenticatedIdentity, CallerIdentity, IdentityResolver};
use crate::origin::{OriginSource, ProviderEndpoint};
use crate::provider::{authorize_once, AuthorizeRequest, IdentityProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated {
        principal: Principal,
        expires_at: Option<DateTime<Utc>>,
    },
    Failed(String),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

struct Inner {
    state: SessionState,
    identity: Option<AuthenticatedIdentity>,
    epoch: u64,
}

enum LoginStart {
    Started(u64),
    AlreadyAuthenticated(Principal),
}

/// The single owner of the current identity.
pub struct SessionStore {
    inner: RwLock<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                state: SessionState::Anonymous,
                identity: None,
                epoch: 0,
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().unwrap().state.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().unwrap().state.is_authenticated()
    }

    /// `None` unless authenticated.
    pub fn principal(&self) -> Option<Principal> {
        match &self.inner.read().unwrap().state {
            SessionState::Authenticated { principal, .. } => Some(*principal),
            _ => None,
        }
    }

    /// Incremented by every logout.
    pub fn epoch(&self) -> u64 {
        self.inner.read().unwrap().epoch
    }

    fn begin_login(&self) -> Result<LoginStart, ClientError> {
        let mut inner = self.inner.write().unwrap();
        match &inner.state {
            SessionState::Authenticated { principal, .. } => {
                return Ok(LoginStart::AlreadyAuthenticated(*principal));
            }
            SessionState::Authenticating => {
                return Err(ClientError::AuthenticationFailure(
                    "login already in progress".into(),
                ));
            }
            SessionState::Anonymous | SessionState::Failed(_) => {}
        }
        inner.state = SessionState::Authenticating;
        Ok(LoginStart::Started(inner.epoch))
    }

    /// Install `identity` if the session is still the one the login started
    /// in. Returns whether it was installed.
    ///
    /// `on_change` runs under the write lock, so no reader sees the new
    /// identity before it has finished.
    fn complete_login(
        &self,
        epoch: u64,
        identity: AuthenticatedIdentity,
        on_change: impl FnOnce(),
    ) -> bool {
        let mut inner = self.inner.write().unwrap();
        if inner.epoch != epoch || inner.state != SessionState::Authenticating {
            return false;
        }
        inner.state = SessionState::Authenticated {
            principal: identity.principal(),
            expires_at: identity.expires_at(),
        };
        inner.identity = Some(identity);
        on_change();
        true
    }

    fn fail_login(&self, epoch: u64, reason: String) {
        let mut inner = self.inner.write().unwrap();
        if inner.epoch == epoch && inner.state == SessionState::Authenticating {
            inner.state = SessionState::Failed(reason);
        }
    }

    /// Back to anonymous. `on_change` runs under the write lock, as in
    /// `complete_login`.
    fn clear(&self, on_change: impl FnOnce()) -> bool {
        let mut inner = self.inner.write().unwrap();
        let was_authenticated = inner.state.is_authenticated();
        inner.state = SessionState::Anonymous;
        inner.identity = None;
        inner.epoch += 1;
        on_change();
        was_authenticated
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityResolver for SessionStore {
    async fn resolve(&self) -> Result<CallerIdentity, ClientError> {
        let inner = self.inner.read().unwrap();
        Ok(match (&inner.state, &inner.identity) {
            (SessionState::Authenticated { .. }, Some(identity)) => {
                CallerIdentity::Authenticated(identity.clone())
            }
            _ => CallerIdentity::Anonymous,
        })
    }
}

/// Marks the login failed if the `login()` future is dropped mid-flight.
struct PendingLogin<'a> {
    store: &'a SessionStore,
    epoch: u64,
    settled: bool,
}

impl Drop for PendingLogin<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.store.fail_login(self.epoch, "login cancelled".into());
        }
    }
}

/// Login and logout.
pub struct SessionController {
    store: Arc<SessionStore>,
    cache: Arc<ActorCache>,
    provider: Arc<dyn IdentityProvider>,
    origin: Arc<dyn OriginSource>,
    local_provider_id: String,
    local_provider_port: u16,
    max_time_to_live: Duration,
    login_timeout: Duration,
}

impl SessionController {
    pub fn new(
        config: &PortalConfig,
        store: Arc<SessionStore>,
        cache: Arc<ActorCache>,
        provider: Arc<dyn IdentityProvider>,
        origin: Arc<dyn OriginSource>,
    ) -> Self {
        Self {
            store,
            cache,
            provider,
            origin,
            local_provider_id: config.local_provider_id.clone(),
            local_provider_port: config.local_provider_port,
            max_time_to_live: config.max_time_to_live,
            login_timeout: config.login_timeout,
        }
    }

    /// The provider a login started now would use.
    pub fn provider_endpoint(&self) -> ProviderEndpoint {
        ProviderEndpoint::select(
            &self.origin.current_origin(),
            &self.local_provider_id,
            self.local_provider_port,
        )
    }

    /// Log in through the identity provider and return the new principal.
    ///
    /// Already authenticated: returns the current principal without opening
    /// the provider. A login already in flight: fails immediately.
    pub async fn login(&self) -> Result<Principal, ClientError> {
        let epoch = match self.store.begin_login()? {
            LoginStart::AlreadyAuthenticated(principal) => return Ok(principal),
            LoginStart::Started(epoch) => epoch,
        };
        let mut pending = PendingLogin {
            store: &self.store,
            epoch,
            settled: false,
        };

        let provider = self.provider_endpoint();
        info!(provider = %provider, local = provider.is_local(), "login started");
        let request = AuthorizeRequest {
            provider,
            max_time_to_live: self.max_time_to_live,
        };

        let outcome = authorize_once(self.provider.as_ref(), request, self.login_timeout)
            .await
            .and_then(|issued| AuthenticatedIdentity::new(issued.identity, issued.expires_at));
        pending.settled = true;

        match outcome {
            Ok(identity) => {
                let principal = identity.principal();
                let installed = self
                    .store
                    .complete_login(epoch, identity, || self.cache.reset_actor());
                if !installed {
                    warn!(%principal, "login finished after logout; discarding");
                    return Err(ClientError::AuthenticationFailure(
                        "login superseded by logout".into(),
                    ));
                }
                info!(%principal, "login succeeded");
                Ok(principal)
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                self.store.fail_login(epoch, e.to_string());
                Err(e)
            }
        }
    }

    /// Forget the identity and drop the current actor. Never fails.
    pub fn logout(&self) {
        let was_authenticated = self.store.clear(|| self.cache.reset_actor());
        if was_authenticated {
            info!("logged out");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.store.principal()
    }

    pub fn state(&self) -> SessionState {
        self.store.state()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
