//! Read-side records returned by `get_token_info` and `get_all_users`.

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

/// Token metadata returned by `get_token_info`.
///
/// # Example
///
/// ```text
/// record {
///   name = "EduCoin";
///   symbol = "EDU";
///   total_supply = 1_000_000 : nat64;
///   creator = principal "lxz6y-…-wqe";
/// }
/// ```
#[derive(Debug, Clone, CandidType, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenInfo {
    /// Display name of the token.
    pub name: String,

    /// Ticker symbol.
    pub symbol: String,

    /// Current supply as reported by the ledger. Grows on `mint`.
    pub total_supply: u64,

    /// The only principal the ledger lets mint.
    pub creator: Principal,
}

/// One holder row from `get_all_users`.
#[derive(Debug, Clone, CandidType, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub user_principal: Principal,
    pub balance: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_info_candid_field_names_match_canister() {
        let info = TokenInfo {
            name: "EduCoin".into(),
            symbol: "EDU".into(),
            total_supply: 1_000_000,
            creator: Principal::anonymous(),
        };
        let bytes = candid::encode_one(info.clone()).unwrap();
        let decoded: TokenInfo = candid::decode_one(&bytes).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn user_info_serialises_principal_as_text() {
        let row = UserInfo {
            user_principal: Principal::anonymous(),
            balance: 42,
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["user_principal"], "2vxsx-fae");
        assert_eq!(json["balance"], 42);
    }
}
