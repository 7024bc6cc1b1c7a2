//! Client-level error type.
//!
//! Every fallible operation in this crate returns [`ClientError`]. Payloads
//! are strings so that one failed actor construction can be handed to every
//! caller awaiting it.
//!
//! Domain outcomes of the ledger (`InsufficientBalance`, `SameAccount`,
//! `Unauthorized`) are **not** errors; they arrive as
//! [`TransferResult`](token_portal_contract::TransferResult) and
//! [`MintResult`](token_portal_contract::MintResult) values.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// A user-supplied principal did not parse. Raised before any network call.
    #[error("invalid principal '{input}': {reason}")]
    InvalidIdentifierFormat { input: String, reason: String },

    /// Root-key fetch failed. Logged and recorded on the agent; never returned
    /// from agent construction.
    #[error("trust bootstrap failed: {0}")]
    TrustBootstrapFailure(String),

    /// Identity-provider login failed, timed out or was superseded by logout.
    #[error("authentication failed: {0}")]
    AuthenticationFailure(String),

    /// The transport could not be built at all.
    #[error("actor construction failed: {0}")]
    ActorConstructionFailure(String),

    /// Transport failure after the agent's bounded retries.
    #[error("network failure calling {method}: {reason}")]
    NetworkFailure { method: String, reason: String },

    /// The canister or replica rejected the call.
    #[error("call to {method} rejected: {reason}")]
    CallRejected { method: String, reason: String },

    /// The reply did not match the contract.
    #[error("could not decode reply of {method}: {reason}")]
    Decode { method: String, reason: String },

    /// An update call was attempted through an agent with no verified root key.
    #[error("refusing update call {method}: root key for this endpoint is not verified")]
    UntrustedUpdate { method: String },

    /// The operation needs an authenticated principal.
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether a retry at a later point could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::NetworkFailure { .. } | ClientError::ActorConstructionFailure(_)
        )
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
