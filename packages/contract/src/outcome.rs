//! Write-side outcomes of `transfer` and `mint`.
//!
//! Every variant is a successful reply from the canister. A refused transfer
//! or an unauthorised mint is data to show the user, not an error to raise.

use std::fmt;

use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Reply to `transfer(to, amount)`.
#[derive(Debug, Clone, Copy, CandidType, Serialize, Deserialize, PartialEq, Eq)]
pub enum TransferResult {
    Success,
    /// The caller holds less than `amount`.
    InsufficientBalance,
    /// The caller tried to pay itself.
    SameAccount,
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferResult::Success)
    }
}

impl fmt::Display for TransferResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferResult::Success => f.write_str("transfer succeeded"),
            TransferResult::InsufficientBalance => {
                f.write_str("insufficient balance for this transfer")
            }
            TransferResult::SameAccount => f.write_str("cannot transfer to the same account"),
        }
    }
}

/// Reply to `mint(to, amount)`.
#[derive(Debug, Clone, Copy, CandidType, Serialize, Deserialize, PartialEq, Eq)]
pub enum MintResult {
    Success,
    /// The caller is not the token creator.
    Unauthorized,
}

impl MintResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MintResult::Success)
    }
}

impl fmt::Display for MintResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintResult::Success => f.write_str("mint succeeded"),
            MintResult::Unauthorized => f.write_str("only the token creator can mint new tokens"),
        }
    }
}
