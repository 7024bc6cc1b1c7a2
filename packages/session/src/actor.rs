//! Typed stub over the ledger canister.
//!
//! A [`TokenActor`] is bound to exactly one [`Agent`] for its whole life.
//! It keeps no state besides that binding: every method is one round trip,
//! and nothing is cached or adjusted locally. A `transfer` followed by a
//! `get_balance` observes whatever the canister's consistency model gives;
//! callers that display balances should re-fetch after writing.

use std::fmt;

use candid::utils::ArgumentEncoder;
use candid::{CandidType, Principal};
use serde::de::DeserializeOwned;
use token_portal_contract::{CallKind, Method, MintResult, TokenInfo, TransferResult, UserInfo};
use tracing::debug;

use crate::agent::Agent;
use crate::error::ClientError;
use crate::trust::TrustStatus;

pub struct TokenActor {
    agent: Agent,
    canister_id: Principal,
    generation: u64,
    allow_uncertified_updates: bool,
}

impl TokenActor {
    pub(crate) fn new(
        agent: Agent,
        canister_id: Principal,
        generation: u64,
        allow_uncertified_updates: bool,
    ) -> Self {
        Self {
            agent,
            canister_id,
            generation,
            allow_uncertified_updates,
        }
    }

    pub fn canister_id(&self) -> Principal {
        self.canister_id
    }

    /// Principal the underlying agent signs as.
    pub fn caller(&self) -> Principal {
        self.agent.principal()
    }

    /// Cache generation this actor was built for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trust(&self) -> TrustStatus {
        self.agent.trust()
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    pub async fn get_token_info(&self) -> Result<TokenInfo, ClientError> {
        self.call(Method::GetTokenInfo, ()).await
    }

    pub async fn get_balance(&self, account: Principal) -> Result<u64, ClientError> {
        self.call(Method::GetBalance, (account,)).await
    }

    pub async fn get_total_supply(&self) -> Result<u64, ClientError> {
        self.call(Method::GetTotalSupply, ()).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<UserInfo>, ClientError> {
        self.call(Method::GetAllUsers, ()).await
    }

    pub async fn is_creator(&self, principal: Principal) -> Result<bool, ClientError> {
        self.call(Method::IsCreator, (principal,)).await
    }

    // ── Updates ──────────────────────────────────────────────────────────────

    pub async fn transfer(&self, to: Principal, amount: u64) -> Result<TransferResult, ClientError> {
        self.call(Method::Transfer, (to, amount)).await
    }

    pub async fn mint(&self, to: Principal, amount: u64) -> Result<MintResult, ClientError> {
        self.call(Method::Mint, (to, amount)).await
    }

    async fn call<A, R>(&self, method: Method, args: A) -> Result<R, ClientError>
    where
        A: ArgumentEncoder,
        R: CandidType + DeserializeOwned,
    {
        let kind = method.kind();
        if kind == CallKind::Update && !self.allow_uncertified_updates {
            // An earlier bootstrap failure is retried here, so a replica that
            // comes back heals the actor without a rebuild.
            if !self.agent.ensure_trust().await.is_certified() {
                return Err(ClientError::UntrustedUpdate {
                    method: method.name().to_string(),
                });
            }
        }

        let arg = candid::encode_args(args).map_err(|e| ClientError::Decode {
            method: method.name().to_string(),
            reason: format!("encoding arguments: {e}"),
        })?;

        debug!(method = method.name(), ?kind, caller = %self.caller(), "dispatching call");
        let transport = self.agent.transport();
        let reply = match kind {
            CallKind::Query => transport.query(&self.canister_id, method.name(), arg).await?,
            CallKind::Update => transport.update(&self.canister_id, method.name(), arg).await?,
        };

        candid::decode_one(&reply).map_err(|e| ClientError::Decode {
            method: method.name().to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for TokenActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenActor")
            .field("canister_id", &self.canister_id.to_text())
            .field("generation", &self.generation)
            .field("agent", &self.agent)
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
