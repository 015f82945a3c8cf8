use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationScheme {
    /// ERC-20 `approve`
    LegacyApproval,
    /// Smart-wallet spend permission
    SpendPermission,
}

impl core::fmt::Display for AuthorizationScheme {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AuthorizationScheme::LegacyApproval => write!(f, "ERC-20 approval"),
            AuthorizationScheme::SpendPermission => write!(f, "spend permission"),
        }
    }
}

/// Standing authorization for `spender` to pull `token` from `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRecord {
    pub owner: Address,
    pub spender: Address,
    pub token: Address,
    pub amount: U256,
    pub scheme: AuthorizationScheme,
    /// Only set for spend permissions
    pub period_days: Option<u32>,
}

/// What has to happen before `spender` can pull the required amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowanceAction {
    NoActionNeeded,
    ApproveLegacy { amount: U256 },
    ApproveSpendPermission { amount: U256, period_days: u32 },
}

impl AllowanceAction {
    pub fn scheme(&self) -> Option<AuthorizationScheme> {
        match self {
            AllowanceAction::NoActionNeeded => None,
            AllowanceAction::ApproveLegacy { .. } => Some(AuthorizationScheme::LegacyApproval),
            AllowanceAction::ApproveSpendPermission { .. } => {
                Some(AuthorizationScheme::SpendPermission)
            }
        }
    }
}

/// Spend permission as granted to or revoked from the manager contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendPermission {
    pub account: Address,
    pub spender: Address,
    pub token: Address,
    pub allowance: U256,
    pub period_days: u32,
}
