//! Caller identity (anonymous or authenticated) and its principal.
//!
//! A [`CallerIdentity`] is what an agent signs with. The principal is derived
//! once, when the identity is constructed, and never recomputed: two
//! identities are the same caller exactly when their principals are equal.
//!
//! # Resolution
//!
//! The actor cache does not own the identity; it asks an
//! [`IdentityResolver`] each time it builds a new actor. Resolver failures
//! are not propagated. [`resolve_or_anonymous`] logs them and falls back to
//! the anonymous identity so that read-only flows keep working.

use std::fmt;
use std::sync::Arc;
use async_trait::async_trait;
use candid::Principal;
use chrono::{DateTime, Utc};
use ic_agent::identity::AnonymousIdentity;
use ic_agent::Identity;
use tracing::warn;

use crate::error::ClientError;

/// A signing identity obtained from an identity provider.
#[derive(Clone)]
pub struct AuthenticatedIdentity {
    signer: Arc<dyn Identity>,
    principal: Principal,
    expires_at: Option<DateTime<Utc>>,
}

impl AuthenticatedIdentity {
    /// Wrap a provider-issued identity, deriving its principal.
    ///
    /// Fails when the identity cannot name its sender, or names the anonymous
    /// principal (such an identity authenticates nobody).
    pub fn new(signer: Arc<dyn Identity>, expires_at: Option<DateTime<Utc>>) -> Result<Self, ClientError> {
        let principal = signer
            .sender()
            .map_err(|e| ClientError::AuthenticationFailure(format!("identity has no sender: {e}")))?;
        if principal == Principal::anonymous() {
            return Err(ClientError::AuthenticationFailure(
                "provider returned the anonymous principal".into(),
            ));
        }
        Ok(Self {
            signer,
            principal,
            expires_at,
        })
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }

    /// When the delegation stops being accepted by the network, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn signer(&self) -> Arc<dyn Identity> {
        Arc::clone(&self.signer)
    }
}

impl fmt::Debug for AuthenticatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedIdentity")
            .field("principal", &self.principal.to_text())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The identity calls are made under.
#[derive(Clone, Debug)]
pub enum CallerIdentity {
    Anonymous,
    Authenticated(AuthenticatedIdentity),
}

impl CallerIdentity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, CallerIdentity::Anonymous)
    }

    /// The caller's principal; `2vxsx-fae` when anonymous.
    pub fn principal(&self) -> Principal {
        match self {
            CallerIdentity::Anonymous => Principal::anonymous(),
            CallerIdentity::Authenticated(id) => id.principal(),
        }
    }

    /// The identity to hand to a transport.
    pub fn signer(&self) -> Arc<dyn Identity> {
        match self {
            CallerIdentity::Anonymous => Arc::new(AnonymousIdentity),
            CallerIdentity::Authenticated(id) => id.signer(),
        }
    }
}

/// Yields the identity the next actor should be built for.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self) -> Result<CallerIdentity, ClientError>;
}

/// A resolver that always answers with the same identity.
#[async_trait]
impl IdentityResolver for CallerIdentity {
    async fn resolve(&self) -> Result<CallerIdentity, ClientError> {
        Ok(self.clone())
    }
}

/// Resolve through `resolver`, degrading to anonymous on failure.
pub async fn resolve_or_anonymous(resolver: &dyn IdentityResolver) -> CallerIdentity {
    match resolver.resolve().await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(error = %e, "identity resolution failed; using anonymous identity");
            CallerIdentity::Anonymous
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
