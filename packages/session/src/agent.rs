//! Agents: a transport bound to an identity, an endpoint and a trust root.
//!
//! # Layers
//!
//! | Type | Responsibility |
//! |------|----------------|
//! | [`Transport`] | Signed query/update dispatch and root-key access (black box) |
//! | [`AgentFactory`] | Builds a transport for an identity and endpoint |
//! | [`Connector`] | Runs a factory, then [`TrustBootstrap`], yielding an [`Agent`] |
//!
//! [`IcAgentFactory`] is the production factory, backed by `ic-agent`. Wire
//! encoding, request signing and transient-error retries all live inside the
//! transport; nothing in this crate loops on a failed call.

use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use candid::Principal;
use ic_agent::AgentError;
use tracing::{debug, info};
use url::Url;

use crate::error::ClientError;
use crate::identity::CallerIdentity;
use crate::trust::{TrustBootstrap, TrustStatus};

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Signed call dispatch to a replica. Arguments and replies are Candid bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn query(
        &self,
        canister_id: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError>;

    async fn update(
        &self,
        canister_id: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError>;

    /// Fetch the endpoint's root key, install it, and return it.
    async fn fetch_root_key(&self) -> Result<Vec<u8>, ClientError>;

    /// Install a root key obtained earlier for the same endpoint.
    fn install_root_key(&self, key: Vec<u8>);
}

/// Builds transports. Implementations must not fetch root keys themselves.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn connect(
        &self,
        identity: &CallerIdentity,
        endpoint: &Url,
    ) -> Result<Arc<dyn Transport>, ClientError>;
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A ready-to-use transport binding. Cheap to clone; safe to drop and rebuild.
///
/// Clones share one trust status. An agent left [`TrustStatus::Unverified`]
/// by a failed bootstrap can try again with [`Agent::ensure_trust`].
#[derive(Clone)]
pub struct Agent {
    transport: Arc<dyn Transport>,
    endpoint: Url,
    principal: Principal,
    trust: Arc<RwLock<TrustStatus>>,
    bootstrap: Arc<TrustBootstrap>,
}

impl Agent {
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Principal of the identity this agent signs with.
    pub fn principal(&self) -> Principal {
        self.principal
    }

    pub fn trust(&self) -> TrustStatus {
        self.trust.read().unwrap().clone()
    }

    /// Current trust status, re-running the bootstrap first if the last
    /// attempt left the agent unverified.
    pub async fn ensure_trust(&self) -> TrustStatus {
        let current = self.trust();
        if current.is_certified() {
            return current;
        }

        debug!(endpoint = %self.endpoint, "retrying trust bootstrap");
        let status = self
            .bootstrap
            .establish(&self.endpoint, self.transport.as_ref())
            .await;
        let mut trust = self.trust.write().unwrap();
        // Another caller may have succeeded meanwhile; never downgrade.
        if status.is_certified() || !trust.is_certified() {
            *trust = status;
        }
        trust.clone()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("endpoint", &self.endpoint.as_str())
            .field("principal", &self.principal.to_text())
            .field("trust", &*self.trust.read().unwrap())
            .finish()
    }
}

/// Turns an identity into an [`Agent`] for a given endpoint.
pub struct Connector {
    factory: Arc<dyn AgentFactory>,
    trust: Arc<TrustBootstrap>,
}

impl Connector {
    pub fn new(factory: Arc<dyn AgentFactory>, trust: TrustBootstrap) -> Self {
        Self {
            factory,
            trust: Arc::new(trust),
        }
    }

    /// Build an agent for `identity` against `endpoint`.
    ///
    /// Only a failure to construct the transport is an error. A failed
    /// root-key fetch yields an agent with [`TrustStatus::Unverified`], which
    /// keeps a handle on the bootstrap so it can retry later.
    pub async fn build_agent(
        &self,
        identity: &CallerIdentity,
        endpoint: &Url,
    ) -> Result<Agent, ClientError> {
        let transport = self.factory.connect(identity, endpoint).await?;
        let trust = self.trust.establish(endpoint, transport.as_ref()).await;

        let agent = Agent {
            transport,
            endpoint: endpoint.clone(),
            principal: identity.principal(),
            trust: Arc::new(RwLock::new(trust)),
            bootstrap: Arc::clone(&self.trust),
        };
        debug!(?agent, "agent built");
        Ok(agent)
    }
}

// ---------------------------------------------------------------------------
// ic-agent backed implementation
// ---------------------------------------------------------------------------

/// Production [`AgentFactory`] over `ic_agent::Agent`.
#[derive(Debug, Clone)]
pub struct IcAgentFactory {
    retry_times: usize,
}

impl IcAgentFactory {
    /// `retry_times` is handed to the transport for TCP-level retries.
    pub fn new(retry_times: usize) -> Self {
        Self { retry_times }
    }
}

#[async_trait]
impl AgentFactory for IcAgentFactory {
    async fn connect(
        &self,
        identity: &CallerIdentity,
        endpoint: &Url,
    ) -> Result<Arc<dyn Transport>, ClientError> {
        let agent = ic_agent::Agent::builder()
            .with_url(endpoint.as_str())
            .with_arc_identity(identity.signer())
            .with_verify_query_signatures(false)
            .with_max_tcp_error_retries(self.retry_times)
            .build()
            .map_err(|e| ClientError::ActorConstructionFailure(e.to_string()))?;

        info!(
            endpoint = %endpoint,
            principal = %identity.principal(),
            retries = self.retry_times,
            "ic agent created"
        );
        Ok(Arc::new(IcTransport { agent }))
    }
}

struct IcTransport {
    agent: ic_agent::Agent,
}

#[async_trait]
impl Transport for IcTransport {
    async fn query(
        &self,
        canister_id: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError> {
        self.agent
            .query(canister_id, method)
            .with_arg(arg)
            .call()
            .await
            .map_err(|e| call_error(method, e))
    }

    async fn update(
        &self,
        canister_id: &Principal,
        method: &str,
        arg: Vec<u8>,
    ) -> Result<Vec<u8>, ClientError> {
        self.agent
            .update(canister_id, method)
            .with_arg(arg)
            .call_and_wait()
            .await
            .map_err(|e| call_error(method, e))
    }

    async fn fetch_root_key(&self) -> Result<Vec<u8>, ClientError> {
        self.agent
            .fetch_root_key()
            .await
            .map_err(|e| ClientError::TrustBootstrapFailure(e.to_string()))?;
        Ok(self.agent.read_root_key())
    }

    fn install_root_key(&self, key: Vec<u8>) {
        self.agent.set_root_key(key);
    }
}

fn call_error(method: &str, e: AgentError) -> ClientError {
    match &e {
        AgentError::TransportError(_) => ClientError::NetworkFailure {
            method: method.to_string(),
            reason: e.to_string(),
        },
        _ => ClientError::CallRejected {
            method: method.to_string(),
            reason: e.to_string(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
