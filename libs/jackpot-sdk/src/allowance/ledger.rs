use std::sync::Arc;

use alloy_primitives::{Address, U256};
use common::interfaces::erc20::IERC20;
use common::interfaces::spend_permission_manager::ISpendPermissionManager;

use super::types::{AllowanceAction, AuthorizationRecord, AuthorizationScheme, SpendPermission};
use crate::chain::{decode_return, ChainAccessor, ContractCall, PreparedCall, ReadRetry};
use crate::config::JackpotConfig;
use crate::errors::{ChainError, ReadError};

/// Computes current versus required token authorization across the ERC-20
/// approval and spend-permission schemes. Holds no state of its own; every
/// answer comes fresh from the chain.
pub struct AllowanceLedger {
    chain: Arc<dyn ChainAccessor>,
    spend_permission_manager: Address,
    period_days: u32,
    gas_limit: u64,
    retry: ReadRetry,
}

impl AllowanceLedger {
    pub fn new(chain: Arc<dyn ChainAccessor>, config: &JackpotConfig) -> Self {
        Self {
            chain,
            spend_permission_manager: config.contracts.spend_permission_manager,
            period_days: config.spend_permission_period_days,
            gas_limit: config.gas_limit,
            retry: ReadRetry::from_config(config),
        }
    }

    pub fn with_retry(mut self, retry: ReadRetry) -> Self {
        self.retry = retry;
        self
    }

    /// ERC-20 allowance, retried.
    pub async fn legacy_allowance(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Result<U256, ReadError> {
        let call = ContractCall::new(token, &IERC20::allowanceCall { owner, spender });
        let chain = &self.chain;

        self.retry
            .run("allowance", || {
                let call = call.clone();
                async move {
                    let data = chain.read(call).await?;
                    decode_return::<IERC20::allowanceCall>(&data)
                }
            })
            .await
    }

    /// Spend-permission allowance from the manager contract. Transport
    /// errors are retried; accounts without permission support revert,
    /// which is returned after the first attempt.
    pub async fn try_spend_permission(
        &self,
        account: Address,
        spender: Address,
        token: Address,
    ) -> Result<U256, ReadError> {
        let call = ContractCall::new(
            self.spend_permission_manager,
            &ISpendPermissionManager::getSpendPermissionCall {
                account,
                spender,
                token,
            },
        );
        let chain = &self.chain;

        self.retry
            .run("getSpendPermission", || {
                let call = call.clone();
                async move {
                    let data = chain.read(call).await?;
                    decode_return::<ISpendPermissionManager::getSpendPermissionCall>(&data)
                }
            })
            .await
    }

    /// Like [`Self::try_spend_permission`], with a failed read reported as zero.
    pub async fn spend_permission_allowance(
        &self,
        account: Address,
        spender: Address,
        token: Address,
    ) -> U256 {
        match self.try_spend_permission(account, spender, token).await {
            Ok(amount) => amount,
            Err(ReadError {
                source: ChainError::CallReverted(reason),
                ..
            }) => {
                tracing::debug!(account = %account, "Spend permissions unsupported: {}", reason);
                U256::ZERO
            }
            Err(e) => {
                tracing::warn!(
                    account = %account,
                    "Spend permission read failed, counting it as zero: {}",
                    e
                );
                U256::ZERO
            }
        }
    }

    /// Non-zero authorization records, at most one per scheme.
    pub async fn current_authorization(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Result<Vec<AuthorizationRecord>, ReadError> {
        let mut records = Vec::with_capacity(2);

        let legacy = self.legacy_allowance(owner, spender, token).await?;
        if !legacy.is_zero() {
            records.push(AuthorizationRecord {
                owner,
                spender,
                token,
                amount: legacy,
                scheme: AuthorizationScheme::LegacyApproval,
                period_days: None,
            });
        }

        let permission = self.spend_permission_allowance(owner, spender, token).await;
        if !permission.is_zero() {
            records.push(AuthorizationRecord {
                owner,
                spender,
                token,
                amount: permission,
                scheme: AuthorizationScheme::SpendPermission,
                period_days: Some(self.period_days),
            });
        }

        Ok(records)
    }

    /// True when `owner` has contract code. A failed lookup counts as `false`.
    pub async fn is_smart_wallet(&self, owner: Address) -> bool {
        match self.chain.code_at(owner).await {
            Ok(code) => !code.is_empty(),
            Err(e) => {
                tracing::warn!(owner = %owner, "Code lookup failed, assuming EOA: {}", e);
                false
            }
        }
    }

    pub async fn ensure_sufficient(
        &self,
        owner: Address,
        spender: Address,
        token: Address,
        required: U256,
    ) -> Result<AllowanceAction, ReadError> {
        if required.is_zero() {
            return Ok(AllowanceAction::NoActionNeeded);
        }

        let records = self.current_authorization(owner, spender, token).await?;
        if records.iter().any(|r| r.amount >= required) {
            tracing::debug!(owner = %owner, spender = %spender, %required, "Allowance sufficient");
            return Ok(AllowanceAction::NoActionNeeded);
        }

        let action = if self.is_smart_wallet(owner).await {
            AllowanceAction::ApproveSpendPermission {
                amount: required,
                period_days: self.period_days,
            }
        } else {
            AllowanceAction::ApproveLegacy { amount: required }
        };

        tracing::debug!(owner = %owner, spender = %spender, ?action, "Allowance insufficient");
        Ok(action)
    }

    /// Second approval attempt after `action` failed. Only a spend
    /// permission has one, and it is always a plain ERC-20 approval.
    pub fn legacy_fallback(&self, action: &AllowanceAction) -> Option<AllowanceAction> {
        match action {
            AllowanceAction::ApproveSpendPermission { amount, .. } => {
                Some(AllowanceAction::ApproveLegacy { amount: *amount })
            }
            _ => None,
        }
    }

    /// Transaction carrying out `action`, or `None` for `NoActionNeeded`.
    pub fn prepare(
        &self,
        action: &AllowanceAction,
        owner: Address,
        spender: Address,
        token: Address,
    ) -> Option<PreparedCall> {
        match *action {
            AllowanceAction::NoActionNeeded => None,
            AllowanceAction::ApproveLegacy { amount } => Some(PreparedCall::new(
                token,
                &IERC20::approveCall {
                    spender,
                    value: amount,
                },
                self.gas_limit,
                "approve",
            )),
            AllowanceAction::ApproveSpendPermission {
                amount,
                period_days,
            } => Some(self.prepare_spend_permission(&SpendPermission {
                account: owner,
                spender,
                token,
                allowance: amount,
                period_days,
            })),
        }
    }

    pub fn prepare_spend_permission(&self, permission: &SpendPermission) -> PreparedCall {
        PreparedCall::new(
            self.spend_permission_manager,
            &ISpendPermissionManager::approveCall {
                account: permission.account,
                spender: permission.spender,
                token: permission.token,
                allowance: permission.allowance,
                period: U256::from(permission.period_days),
            },
            self.gas_limit,
            "approveSpendPermission",
        )
    }

    pub fn prepare_revoke(&self, permission: &SpendPermission) -> PreparedCall {
        PreparedCall::new(
            self.spend_permission_manager,
            &ISpendPermissionManager::revokeCall {
                account: permission.account,
                spender: permission.spender,
                token: permission.token,
            },
            self.gas_limit,
            "revokeSpendPermission",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SimulatedChain;
    use alloy_sol_types::SolCall;
    use std::time::Duration;

    const OWNER: Address = Address::repeat_byte(1);
    const SPENDER: Address = Address::repeat_byte(2);

    fn permission_reads(chain: &SimulatedChain) -> usize {
        chain
            .reads()
            .iter()
            .filter(|c| {
                c.input
                    .starts_with(&ISpendPermissionManager::getSpendPermissionCall::SELECTOR)
            })
            .count()
    }

    fn ledger(chain: &Arc<SimulatedChain>) -> (AllowanceLedger, Address) {
        let config = JackpotConfig::default();
        let token = config.contracts.token;
        let ledger = AllowanceLedger::new(chain.clone(), &config)
            .with_retry(ReadRetry::new(3, Duration::ZERO));
        (ledger, token)
    }

    #[tokio::test]
    async fn test_current_authorization_skips_zero() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);
        chain.set_allowance(OWNER, SPENDER, U256::from(10u64));

        let records = ledger.current_authorization(OWNER, SPENDER, token).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].scheme, AuthorizationScheme::LegacyApproval);
        assert_eq!(records[0].amount, U256::from(10u64));
    }

    #[tokio::test]
    async fn test_unsupported_spend_permission_is_not_an_error() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);
        chain.set_spend_permission_supported(false);

        let records = ledger.current_authorization(OWNER, SPENDER, token).await.unwrap();
        assert!(records.is_empty());
        // a revert is final, no second attempt
        assert_eq!(permission_reads(&chain), 1);
    }

    #[tokio::test]
    async fn test_transient_spend_permission_failure_is_retried() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);
        chain.make_smart_wallet(OWNER);
        chain.set_spend_permission(OWNER, SPENDER, token, U256::from(100u64));
        chain.fail_reads(ISpendPermissionManager::getSpendPermissionCall::SELECTOR, 1);

        let action = ledger
            .ensure_sufficient(OWNER, SPENDER, token, U256::from(50u64))
            .await
            .unwrap();

        // the existing permission is found, so no approval goes out
        assert_eq!(action, AllowanceAction::NoActionNeeded);
        assert_eq!(permission_reads(&chain), 2);
    }

    #[tokio::test]
    async fn test_legacy_read_failure_surfaces() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);
        chain.fail_reads(IERC20::allowanceCall::SELECTOR, 5);

        let err = ledger
            .current_authorization(OWNER, SPENDER, token)
            .await
            .unwrap_err();
        assert_eq!(err.attempts, 3);
    }

    #[tokio::test]
    async fn test_ensure_sufficient_prefers_spend_permission_for_smart_wallet() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);
        chain.make_smart_wallet(OWNER);

        let action = ledger
            .ensure_sufficient(OWNER, SPENDER, token, U256::from(5u64))
            .await
            .unwrap();
        assert_eq!(
            action,
            AllowanceAction::ApproveSpendPermission {
                amount: U256::from(5u64),
                period_days: 30
            }
        );
    }

    #[tokio::test]
    async fn test_ensure_sufficient_eoa_gets_legacy() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);

        let action = ledger
            .ensure_sufficient(OWNER, SPENDER, token, U256::from(5u64))
            .await
            .unwrap();
        assert_eq!(action, AllowanceAction::ApproveLegacy { amount: U256::from(5u64) });
    }

    #[tokio::test]
    async fn test_code_lookup_failure_means_eoa() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, _) = ledger(&chain);
        chain.make_smart_wallet(OWNER);
        chain.fail_code_lookup();

        assert!(!ledger.is_smart_wallet(OWNER).await);
    }

    #[tokio::test]
    async fn test_any_single_record_suffices() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, token) = ledger(&chain);
        chain.set_allowance(OWNER, SPENDER, U256::from(3u64));
        chain.set_spend_permission(OWNER, SPENDER, token, U256::from(8u64));

        let action = ledger
            .ensure_sufficient(OWNER, SPENDER, token, U256::from(8u64))
            .await
            .unwrap();
        assert_eq!(action, AllowanceAction::NoActionNeeded);

        // records are not summed
        let action = ledger
            .ensure_sufficient(OWNER, SPENDER, token, U256::from(9u64))
            .await
            .unwrap();
        assert_ne!(action, AllowanceAction::NoActionNeeded);
    }

    #[test]
    fn test_legacy_fallback() {
        let chain = Arc::new(SimulatedChain::new(OWNER));
        let (ledger, _) = ledger(&chain);
        let amount = U256::from(1u64);

        assert_eq!(
            ledger.legacy_fallback(&AllowanceAction::ApproveSpendPermission {
                amount,
                period_days: 30
            }),
            Some(AllowanceAction::ApproveLegacy { amount })
        );
        assert_eq!(
            ledger.legacy_fallback(&AllowanceAction::ApproveLegacy { amount }),
            None
        );
        assert_eq!(ledger.legacy_fallback(&AllowanceAction::NoActionNeeded), None);
    }
}
