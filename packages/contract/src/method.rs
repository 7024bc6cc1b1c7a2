//! Method table of the ledger canister.

use std::fmt;

/// Whether a method is dispatched as a query or an update call.
///
/// Queries are answered by a single replica and are not certified in the
/// reference deployment. Updates go through consensus and are signed by the
/// caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Update,
}

/// Every method the client calls on the canister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GetTokenInfo,
    GetBalance,
    GetTotalSupply,
    GetAllUsers,
    IsCreator,
    Transfer,
    Mint,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::GetTokenInfo,
        Method::GetBalance,
        Method::GetTotalSupply,
        Method::GetAllUsers,
        Method::IsCreator,
        Method::Transfer,
        Method::Mint,
    ];

    /// The exported canister method name.
    pub fn name(&self) -> &'static str {
        match self {
            Method::GetTokenInfo => "get_token_info",
            Method::GetBalance => "get_balance",
            Method::GetTotalSupply => "get_total_supply",
            Method::GetAllUsers => "get_all_users",
            Method::IsCreator => "is_creator",
            Method::Transfer => "transfer",
            Method::Mint => "mint",
        }
    }

    pub fn kind(&self) -> CallKind {
        match self {
            Method::Transfer | Method::Mint => CallKind::Update,
            _ => CallKind::Query,
        }
    }

    /// Look a method up by its canister name.
    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transfer_and_mint_are_updates() {
        let updates: Vec<_> = Method::ALL
            .iter()
            .filter(|m| m.kind() == CallKind::Update)
            .map(|m| m.name())
            .collect();
        assert_eq!(updates, vec!["transfer", "mint"]);
    }

    #[test]
    fn from_name_inverts_name() {
        for m in Method::ALL {
            assert_eq!(Method::from_name(m.name()), Some(m));
        }
        assert_eq!(Method::from_name("burn"), None);
    }
}
