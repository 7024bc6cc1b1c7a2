//! Session and actor lifecycle for the Token Portal ledger client.
//!
//! This crate decides *who* the client calls the ledger canister as, and
//! keeps exactly one callable stub for that caller alive at a time. Ledger
//! rules live on the canister; nothing here second-guesses them.
//!
//! # Components
//!
//! | Module | Role |
//! |---|---|
//! | [`trust`] | Root-key bootstrap per network endpoint |
//! | [`identity`] | Anonymous / authenticated caller and its principal |
//! | [`agent`] | Identity + endpoint + trust → signed transport |
//! | [`cache`] | Single-slot memo of the current [`TokenActor`] |
//! | [`session`] | Login / logout state machine; resets the cache |
//! | [`client`] | [`PortalClient`], the object a front end holds |
//! | [`diagnostics`] | Step-by-step connection self-test |
//! | [`memory`] | In-process ledger and providers for tests and demos |
//!
//! # Wiring
//!
//! ```text
//! PortalClient
//!   ├── SessionController ──login/logout──▶ SessionStore
//!   │          └───────── reset_actor() ──▶ ActorCache
//!   └── ActorCache ──resolve──▶ SessionStore (IdentityResolver)
//!            └──build_agent──▶ Connector ──▶ AgentFactory + TrustBootstrap
//! ```

pub mod actor;
pub mod agent;
pub mod cache;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod identity;
pub mod memory;
pub mod origin;
pub mod provider;
pub mod session;
pub mod trust;

pub use actor::TokenActor;
pub use agent::{Agent, AgentFactory, Connector, IcAgentFactory, Transport};
pub use cache::{ActorCache, ActorHandle};
pub use client::{parse_principal, AccountSummary, PortalClient};
pub use config::PortalConfig;
pub use diagnostics::{run_connection_check, ConnectionReport, StepStatus};
pub use error::ClientError;
pub use identity::{AuthenticatedIdentity, CallerIdentity, IdentityResolver};
pub use origin::{MutableOrigin, OriginSource, PageOrigin, ProviderEndpoint};
pub use provider::{AuthCallbacks, AuthorizeRequest, IdentityProvider, IssuedIdentity, PemIdentityProvider};
pub use session::{SessionController, SessionState, SessionStore};
pub use token_portal_contract as contract;
pub use trust::{TrustBootstrap, TrustStatus};
