//! End-to-end tests for the Token Portal client.
//!
//! Each test builds a [`PortalClient`] over an in-process [`MemoryLedger`]
//! (real Candid on the wire, no network) and drives it through the public
//! API only, the way a front end would.
//!
//! # Coverage
//!
//! | Test | Property |
//! |------|----------|
//! | `anonymous_reads_work_without_login` | Read-only flows need no identity |
//! | `malformed_recipient_never_reaches_network` | Identifier parsing is pre-network |
//! | `malformed_balance_lookup_never_reaches_network` | Identifier parsing is pre-network |
//! | `transfer_moves_balance` | 100 → transfer 30 → 70 / 30 |
//! | `transfer_outcomes_are_data` | Ledger refusals are values, not errors |
//! | `non_creator_mint_is_unauthorized` | Unauthorized is a value; no retry |
//! | `creator_mint_grows_supply` | Mint credits recipient and supply |
//! | `logout_rebinds_actor_to_anonymous` | Identity change invalidates the actor |
//! | `actor_is_reused_between_calls` | One construction per identity |
//! | `switching_users_rebuilds_actor` | Login after logout binds the new caller |
//! | `unverified_trust_blocks_updates_only` | Root-key failure degrades, not fails |
//! | `updates_resume_once_root_key_is_reachable` | Trust bootstrap is retried; no rebuild |
//! | `network_failure_is_reported_and_recoverable` | Transport errors surface; cache survives |

use std::sync::Arc;

use ic_agent::Identity as _;
use token_portal_session::contract::{MintResult, Principal, TransferResult};
use token_portal_session::memory::{
    test_identity, MemoryAgentFactory, MemoryIdentityProvider, MemoryLedger, ProviderScript,
};
use token_portal_session::{
    AgentFactory, ClientError, IdentityProvider, PageOrigin, PortalClient, PortalConfig,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    client: PortalClient,
    ledger: Arc<MemoryLedger>,
    factory: Arc<MemoryAgentFactory>,
    provider: Arc<MemoryIdentityProvider>,
}

fn fixture(ledger: MemoryLedger) -> Fixture {
    let ledger = Arc::new(ledger);
    let factory = Arc::new(MemoryAgentFactory::new(Arc::clone(&ledger)));
    let provider = Arc::new(MemoryIdentityProvider::new());
    let mut config = PortalConfig::local();
    config.canister_id = ledger.canister_id();

    let client = PortalClient::new(
        config,
        Arc::clone(&factory) as Arc<dyn AgentFactory>,
        Arc::clone(&provider) as Arc<dyn IdentityProvider>,
        Arc::new(PageOrigin::parse("http://localhost:3000").unwrap()),
    );
    Fixture {
        client,
        ledger,
        factory,
        provider,
    }
}

fn principal(n: u8) -> Principal {
    test_identity(n).sender().unwrap()
}

/// Ledger whose creator (identity 1) holds `supply`.
fn ledger_with(supply: u64) -> MemoryLedger {
    MemoryLedger::with_creator(principal(1), supply)
}

async fn login_as(f: &Fixture, n: u8) {
    f.provider.push(ProviderScript::Approve(test_identity(n)));
    let p = f.client.login().await.expect("login");
    assert_eq!(p, principal(n));
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[tokio::test]
async fn anonymous_reads_work_without_login() {
    let f = fixture(ledger_with(1_000));

    let info = f.client.token_info().await.unwrap();
    assert_eq!(info.name, "EduCoin");
    assert_eq!(f.client.total_supply().await.unwrap(), 1_000);
    assert_eq!(
        f.client.balance_of(&principal(1).to_text()).await.unwrap(),
        1_000
    );
    assert_eq!(f.client.holders().await.unwrap().len(), 1);
    assert!(!f.client.is_authenticated());
}

#[tokio::test]
async fn malformed_balance_lookup_never_reaches_network() {
    let f = fixture(ledger_with(10));

    let err = f.client.balance_of("definitely not a principal").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidIdentifierFormat { .. }));
    assert_eq!(f.factory.connects(), 0, "no actor was even built");
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_recipient_never_reaches_network() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;

    for bad in ["abc", "hello world", "aaaaa-aa!"] {
        let err = f.client.transfer(bad, 1).await.unwrap_err();
        assert!(
            matches!(err, ClientError::InvalidIdentifierFormat { .. }),
            "{bad:?} gave {err:?}"
        );
        let err = f.client.mint(bad, 1).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidIdentifierFormat { .. }));
    }
    assert_eq!(f.ledger.update_calls(), 0);
}

#[tokio::test]
async fn transfer_moves_balance() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;

    let outcome = f.client.transfer(&principal(2).to_text(), 30).await.unwrap();
    assert_eq!(outcome, TransferResult::Success);

    assert_eq!(f.client.my_balance().await.unwrap(), 70);
    assert_eq!(f.client.balance_of(&principal(2).to_text()).await.unwrap(), 30);
    assert_eq!(f.client.total_supply().await.unwrap(), 100);
}

#[tokio::test]
async fn transfer_outcomes_are_data() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;

    let too_much = f.client.transfer(&principal(2).to_text(), 101).await.unwrap();
    assert_eq!(too_much, TransferResult::InsufficientBalance);

    let to_self = f.client.transfer(&principal(1).to_text(), 1).await.unwrap();
    assert_eq!(to_self, TransferResult::SameAccount);

    assert_eq!(f.client.my_balance().await.unwrap(), 100);
}

#[tokio::test]
async fn non_creator_mint_is_unauthorized() {
    let f = fixture(ledger_with(100));
    login_as(&f, 2).await;

    let outcome = f.client.mint(&principal(2).to_text(), 50).await.unwrap();
    assert_eq!(outcome, MintResult::Unauthorized);
    assert_eq!(f.ledger.update_calls(), 1, "no retry on a domain refusal");
    assert_eq!(f.client.total_supply().await.unwrap(), 100);
    assert!(!f.client.am_creator().await.unwrap());
}

#[tokio::test]
async fn creator_mint_grows_supply() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;

    let outcome = f.client.mint(&principal(3).to_text(), 25).await.unwrap();
    assert_eq!(outcome, MintResult::Success);
    assert_eq!(f.client.total_supply().await.unwrap(), 125);
    assert_eq!(f.client.balance_of(&principal(3).to_text()).await.unwrap(), 25);
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn logout_rebinds_actor_to_anonymous() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;
    let signed_in = f.client.actor().await.unwrap();
    assert_eq!(signed_in.caller(), principal(1));

    f.client.logout();
    let actor = f.client.actor().await.unwrap();
    assert_eq!(actor.caller(), Principal::anonymous());
    assert!(!Arc::ptr_eq(&signed_in, &actor));
    assert_eq!(
        f.client.transfer(&principal(2).to_text(), 1).await.unwrap_err(),
        ClientError::NotAuthenticated
    );
}

#[tokio::test]
async fn actor_is_reused_between_calls() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;

    f.client.token_info().await.unwrap();
    f.client.my_balance().await.unwrap();
    f.client.holders().await.unwrap();
    f.client.account_summary().await.unwrap();

    assert_eq!(f.factory.connects(), 1);
    assert_eq!(f.client.cache().construction_count(), 1);
}

#[tokio::test]
async fn switching_users_rebuilds_actor() {
    let f = fixture(ledger_with(100));
    login_as(&f, 1).await;
    f.client.transfer(&principal(2).to_text(), 40).await.unwrap();

    f.client.logout();
    login_as(&f, 2).await;
    assert_eq!(f.client.my_balance().await.unwrap(), 40);
    f.client.transfer(&principal(1).to_text(), 15).await.unwrap();

    assert_eq!(f.client.balance_of(&principal(1).to_text()).await.unwrap(), 75);
    assert_eq!(
        f.factory.connected_principals(),
        vec![principal(1), principal(2)]
    );
}

#[tokio::test]
async fn unverified_trust_blocks_updates_only() {
    let f = fixture(ledger_with(100));
    f.ledger.fail_root_key_fetch(true);
    login_as(&f, 1).await;

    assert_eq!(f.client.my_balance().await.unwrap(), 100);
    let err = f.client.transfer(&principal(2).to_text(), 1).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::UntrustedUpdate {
            method: "transfer".into()
        }
    );
    assert_eq!(f.ledger.update_calls(), 0);
}

#[tokio::test]
async fn updates_resume_once_root_key_is_reachable() {
    let f = fixture(ledger_with(100));
    f.ledger.fail_root_key_fetch(true);
    login_as(&f, 1).await;

    let err = f.client.transfer(&principal(2).to_text(), 5).await.unwrap_err();
    assert!(matches!(err, ClientError::UntrustedUpdate { .. }));

    f.ledger.fail_root_key_fetch(false);
    for _ in 0..3 {
        let outcome = f.client.transfer(&principal(2).to_text(), 5).await.unwrap();
        assert_eq!(outcome, TransferResult::Success);
    }
    assert_eq!(f.client.balance_of(&principal(2).to_text()).await.unwrap(), 15);
    assert!(f.client.actor().await.unwrap().trust().is_certified());
    assert_eq!(f.factory.connects(), 1, "the same actor heals in place");
    assert_eq!(f.ledger.root_key_fetches(), 3, "no fetches once verified");
}

#[tokio::test]
async fn network_failure_is_reported_and_recoverable() {
    let f = fixture(ledger_with(100));
    f.client.token_info().await.unwrap();

    f.ledger.fail_calls(true);
    let err = f.client.total_supply().await.unwrap_err();
    assert!(err.is_transient(), "{err:?}");

    f.ledger.fail_calls(false);
    assert_eq!(f.client.total_supply().await.unwrap(), 100);
    assert_eq!(f.factory.connects(), 1, "a failed call does not drop the actor");
}
