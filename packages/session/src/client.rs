//! The application object.
//!
//! [`PortalClient`] wires the session store, actor cache and session
//! controller together and exposes the flows a front end needs. It holds no
//! ledger state of its own: every read goes to the canister, and callers that
//! display a balance after a write should read it again.

use std::cmp::Reverse;
use std::sync::Arc;

use candid::Principal;
use serde::Serialize;
use token_portal_contract::{MintResult, TokenInfo, TransferResult, UserInfo};
use tracing::info;

use crate::agent::{AgentFactory, IcAgentFactory};
use crate::cache::{ActorCache, ActorHandle};
use crate::config::PortalConfig;
use crate::error::ClientError;
use crate::identity::IdentityResolver;
use crate::origin::OriginSource;
use crate::provider::IdentityProvider;
use crate::session::{SessionController, SessionState, SessionStore};

/// Parse user input as a principal. Surrounding whitespace is ignored.
pub fn parse_principal(input: &str) -> Result<Principal, ClientError> {
    Principal::from_text(input.trim()).map_err(|e| ClientError::InvalidIdentifierFormat {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Balance and token metadata for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub principal: Principal,
    pub balance: u64,
    pub token: TokenInfo,
}

pub struct PortalClient {
    config: PortalConfig,
    store: Arc<SessionStore>,
    cache: Arc<ActorCache>,
    session: SessionController,
}

impl PortalClient {
    pub fn new(
        config: PortalConfig,
        factory: Arc<dyn AgentFactory>,
        provider: Arc<dyn IdentityProvider>,
        origin: Arc<dyn OriginSource>,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let cache = Arc::new(ActorCache::new(
            &config,
            Arc::clone(&store) as Arc<dyn IdentityResolver>,
            factory,
        ));
        let session = SessionController::new(
            &config,
            Arc::clone(&store),
            Arc::clone(&cache),
            provider,
            origin,
        );
        Self {
            config,
            store,
            cache,
            session,
        }
    }

    /// A client that talks to a real replica through `ic-agent`.
    pub fn connect(
        config: PortalConfig,
        provider: Arc<dyn IdentityProvider>,
        origin: Arc<dyn OriginSource>,
    ) -> Self {
        let factory = Arc::new(IcAgentFactory::new(config.retry_times));
        info!(
            canister = %config.canister_id,
            host = %config.network_host,
            "token portal client created"
        );
        Self::new(config, factory, provider, origin)
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn cache(&self) -> &ActorCache {
        &self.cache
    }

    // ── Session ──────────────────────────────────────────────────────────────

    pub async fn login(&self) -> Result<Principal, ClientError> {
        self.session.login().await
    }

    pub fn logout(&self) {
        self.session.logout();
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

    pub async fn actor(&self) -> Result<ActorHandle, ClientError> {
        self.cache.get_actor().await
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    pub async fn token_info(&self) -> Result<TokenInfo, ClientError> {
        self.actor().await?.get_token_info().await
    }

    pub async fn total_supply(&self) -> Result<u64, ClientError> {
        self.actor().await?.get_total_supply().await
    }

    /// Balance of the account named by `principal_text`.
    pub async fn balance_of(&self, principal_text: &str) -> Result<u64, ClientError> {
        let account = parse_principal(principal_text)?;
        self.actor().await?.get_balance(account).await
    }

    pub async fn my_balance(&self) -> Result<u64, ClientError> {
        let principal = self.require_principal()?;
        self.actor().await?.get_balance(principal).await
    }

    /// Every holder, largest balance first. Ties are ordered by principal text.
    pub async fn holders(&self) -> Result<Vec<UserInfo>, ClientError> {
        let mut users = self.actor().await?.get_all_users().await?;
        users.sort_by_cached_key(|u| (Reverse(u.balance), u.user_principal.to_text()));
        Ok(users)
    }

    /// Whether the signed-in user created the token. `false` when anonymous.
    pub async fn am_creator(&self) -> Result<bool, ClientError> {
        match self.store.principal() {
            Some(principal) => self.actor().await?.is_creator(principal).await,
            None => Ok(false),
        }
    }

    pub async fn account_summary(&self) -> Result<AccountSummary, ClientError> {
        let principal = self.require_principal()?;
        let actor = self.actor().await?;
        let (balance, token) =
            futures::try_join!(actor.get_balance(principal), actor.get_token_info())?;
        Ok(AccountSummary {
            principal,
            balance,
            token,
        })
    }

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Send `amount` to `to_text`. Ledger refusals come back as data.
    pub async fn transfer(&self, to_text: &str, amount: u64) -> Result<TransferResult, ClientError> {
        let to = parse_principal(to_text)?;
        let from = self.require_principal()?;
        let outcome = self.actor().await?.transfer(to, amount).await?;
        info!(%from, %to, amount, ?outcome, "transfer submitted");
        Ok(outcome)
    }

    /// Mint `amount` new tokens to `to_text`. Only the creator succeeds.
    pub async fn mint(&self, to_text: &str, amount: u64) -> Result<MintResult, ClientError> {
        let to = parse_principal(to_text)?;
        let caller = self.require_principal()?;
        let outcome = self.actor().await?.mint(to, amount).await?;
        info!(%caller, %to, amount, ?outcome, "mint submitted");
        Ok(outcome)
    }

    fn require_principal(&self) -> Result<Principal, ClientError> {
        self.store.principal().ok_or(ClientError::NotAuthenticated)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
