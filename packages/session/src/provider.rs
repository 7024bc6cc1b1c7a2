//! Identity providers and the login bridge.
//!
//! Providers speak a callback protocol: they are handed an
//! [`AuthCallbacks`] pair and call exactly one side when the user finishes
//! (or abandons) the flow. [`authorize_once`] turns that into a single
//! awaited result with a deadline:
//!
//! | Provider behaviour | Result |
//! |--------------------|--------|
//! | calls `succeed` | `Ok(IssuedIdentity)` |
//! | calls `fail(reason)` | `AuthenticationFailure(reason)` |
//! | drops both callbacks | `AuthenticationFailure("... closed ...")` |
//! | does nothing before the deadline | `AuthenticationFailure("... timed out ...")` |
//!
//! There is no retry. A late callback after the deadline is ignored.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use ic_agent::identity::BasicIdentity;
use ic_agent::Identity;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::origin::ProviderEndpoint;

/// One login attempt, as presented to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub provider: ProviderEndpoint,
    /// Requested lifetime of the issued delegation. The provider enforces it.
    pub max_time_to_live: Duration,
}

/// What a provider hands back on success.
#[derive(Clone)]
pub struct IssuedIdentity {
    pub identity: Arc<dyn Identity>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for IssuedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedIdentity")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

type SuccessFn = Box<dyn FnOnce(IssuedIdentity) + Send>;
type ErrorFn = Box<dyn FnOnce(String) + Send>;

/// The success/error callback pair. At most one side ever runs.
pub struct AuthCallbacks {
    on_success: SuccessFn,
    on_error: ErrorFn,
}

impl AuthCallbacks {
    pub fn new(
        on_success: impl FnOnce(IssuedIdentity) + Send + 'static,
        on_error: impl FnOnce(String) + Send + 'static,
    ) -> Self {
        Self {
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    pub fn succeed(self, identity: IssuedIdentity) {
        (self.on_success)(identity);
    }

    pub fn fail(self, reason: String) {
        (self.on_error)(reason);
    }
}

/// `now + ttl`, or `None` if that is not representable.
pub fn expiry_after(ttl: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
}

/// A login front end, e.g. Internet Identity.
pub trait IdentityProvider: Send + Sync {
    /// Start a login. Must eventually call one side of `callbacks`, or drop them.
    fn authorize(&self, request: AuthorizeRequest, callbacks: AuthCallbacks);
}

/// Run one provider round trip and wait for its answer, up to `timeout`.
pub async fn authorize_once(
    provider: &dyn IdentityProvider,
    request: AuthorizeRequest,
    timeout: Duration,
) -> Result<IssuedIdentity, ClientError> {
    let (tx, rx) = oneshot::channel::<Result<IssuedIdentity, String>>();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let on_error_tx = Arc::clone(&tx);

    let callbacks = AuthCallbacks::new(
        move |identity| {
            if let Some(tx) = tx.lock().unwrap().take() {
                let _ = tx.send(Ok(identity));
            }
        },
        move |reason| {
            if let Some(tx) = on_error_tx.lock().unwrap().take() {
                let _ = tx.send(Err(reason));
            }
        },
    );

    debug!(provider = %request.provider, "opening identity provider");
    provider.authorize(request, callbacks);

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(Ok(issued))) => Ok(issued),
        Ok(Ok(Err(reason))) => Err(ClientError::AuthenticationFailure(reason)),
        Ok(Err(_)) => Err(ClientError::AuthenticationFailure(
            "identity provider closed without answering".into(),
        )),
        Err(_) => Err(ClientError::AuthenticationFailure(format!(
            "login timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Logs in with an Ed25519 key from a PEM file. Used by the CLI, where no
/// browser provider exists.
#[derive(Debug, Clone)]
pub struct PemIdentityProvider {
    path: PathBuf,
}

impl PemIdentityProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IdentityProvider for PemIdentityProvider {
    fn authorize(&self, request: AuthorizeRequest, callbacks: AuthCallbacks) {
        match BasicIdentity::from_pem_file(&self.path) {
            Ok(identity) => {
                info!(path = %self.path.display(), "loaded identity from PEM file");
                callbacks.succeed(IssuedIdentity {
                    identity: Arc::new(identity),
                    expires_at: expiry_after(request.max_time_to_live),
                });
            }
            Err(e) => callbacks.fail(format!("reading {}: {e}", self.path.display())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{test_identity, MemoryIdentityProvider, ProviderScript};

    fn request() -> AuthorizeRequest {
        AuthorizeRequest {
            provider: ProviderEndpoint::Production("https://identity.ic0.app".into()),
            max_time_to_live: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn success_callback_resolves() {
        let provider = MemoryIdentityProvider::new();
        provider.push(ProviderScript::Approve(test_identity(1)));

        let issued = authorize_once(&provider, request(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(issued.identity.sender().unwrap(), test_identity(1).sender().unwrap());
        assert!(issued.expires_at.is_some());
    }

    #[tokio::test]
    async fn error_callback_carries_reason() {
        let provider = MemoryIdentityProvider::new();
        provider.push(ProviderScript::Reject("user closed the window".into()));

        let err = authorize_once(&provider, request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::AuthenticationFailure("user closed the window".into()));
    }

    #[tokio::test]
    async fn dropped_callbacks_fail() {
        let provider = MemoryIdentityProvider::new();
        provider.push(ProviderScript::Abandon);

        let err = authorize_once(&provider, request(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthenticationFailure(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_provider_times_out() {
        let provider = MemoryIdentityProvider::new();
        provider.push(ProviderScript::Hold);

        let err = authorize_once(&provider, request(), Duration::from_secs(10))
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::AuthenticationFailure("login timed out after 10s".into()));
        // A late answer lands nowhere.
        assert!(provider.approve_pending(test_identity(1)));
    }

    #[test]
    fn missing_pem_file_fails() {
        let provider = PemIdentityProvider::new("/nonexistent/identity.pem");
        let failed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&failed);
        provider.authorize(
            request(),
            AuthCallbacks::new(|_| panic!("must not succeed"), move |reason| {
                *sink.lock().unwrap() = Some(reason);
            }),
        );
        assert!(failed.lock().unwrap().is_some());
    }
}
