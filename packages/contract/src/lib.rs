//! Wire contract of the token ledger canister.
//!
//! This crate encodes the canister's Candid interface as Rust types. The
//! ledger itself (balances, supply, who may mint) lives on the remote
//! service; nothing here duplicates that logic.
//!
//! # Methods covered
//!
//! | Method | Kind | Arguments | Result |
//! |--------|------|-----------|--------|
//! | `get_token_info` | query | (none) | [`TokenInfo`] |
//! | `get_balance` | query | `principal` | `nat64` |
//! | `get_total_supply` | query | (none) | `nat64` |
//! | `get_all_users` | query | (none) | `vec` [`UserInfo`] |
//! | `is_creator` | query | `principal` | `bool` |
//! | `transfer` | update | `principal`, `nat64` | [`TransferResult`] |
//! | `mint` | update | `principal`, `nat64` | [`MintResult`] |

pub mod method;
pub mod outcome;
pub mod token;

pub use candid::Principal;
pub use method::{CallKind, Method};
pub use outcome::{MintResult, TransferResult};
pub use token::{TokenInfo, UserInfo};
