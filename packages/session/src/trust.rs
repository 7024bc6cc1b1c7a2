//! Trust bootstrap: the root key that certifies replies from an endpoint.
//!
//! Mainnet agents ship with the network's root key and need no bootstrap.
//! A local replica generates its own key, so the client fetches it once per
//! endpoint and installs it on every agent built for that endpoint
//! afterwards. Keys are held for the lifetime of the process and never
//! written anywhere.
//!
//! A failed fetch is **not** fatal. The agent is still handed out, marked
//! [`TrustStatus::Unverified`], and can serve query calls, which are not
//! certified in this deployment. Whether update calls may proceed through
//! such an agent is decided by the actor (see
//! [`PortalConfig::allow_uncertified_updates`](crate::PortalConfig)).

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info, warn};
use url::Url;

use crate::agent::Transport;

/// How far replies through an agent can be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustStatus {
    /// The agent's built-in mainnet root key is used as-is.
    Builtin,
    /// A root key was fetched from (or previously fetched for) the endpoint.
    Verified,
    /// The root key could not be obtained; certified replies cannot be checked.
    Unverified { reason: String },
}

impl TrustStatus {
    /// Whether certified (update) replies can be validated.
    pub fn is_certified(&self) -> bool {
        !matches!(self, TrustStatus::Unverified { .. })
    }
}

/// Fetches and remembers root keys per endpoint.
#[derive(Debug)]
pub struct TrustBootstrap {
    fetch_root_key: bool,
    roots: Mutex<HashMap<String, Vec<u8>>>,
}

impl TrustBootstrap {
    /// `fetch_root_key = false` trusts the transport's built-in key.
    pub fn new(fetch_root_key: bool) -> Self {
        Self {
            fetch_root_key,
            roots: Mutex::new(HashMap::new()),
        }
    }

    /// Make `transport` able to validate replies from `endpoint`.
    pub async fn establish(&self, endpoint: &Url, transport: &dyn Transport) -> TrustStatus {
        if !self.fetch_root_key {
            return TrustStatus::Builtin;
        }

        let cached = self.roots.lock().unwrap().get(endpoint.as_str()).cloned();
        if let Some(key) = cached {
            debug!(endpoint = %endpoint, "installing cached root key");
            transport.install_root_key(key);
            return TrustStatus::Verified;
        }

        match transport.fetch_root_key().await {
            Ok(key) => {
                info!(
                    endpoint = %endpoint,
                    fingerprint = %hex::encode(&key[..key.len().min(8)]),
                    "root key fetched"
                );
                self.roots
                    .lock()
                    .unwrap()
                    .insert(endpoint.as_str().to_string(), key);
                TrustStatus::Verified
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "root key fetch failed; continuing without certification");
                TrustStatus::Unverified {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Whether a key for `endpoint` is already known.
    pub fn has_root(&self, endpoint: &Url) -> bool {
        self.roots.lock().unwrap().contains_key(endpoint.as_str())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
