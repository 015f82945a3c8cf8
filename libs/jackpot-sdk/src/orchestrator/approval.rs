use alloy_primitives::{Address, B256};

use super::state::{PurchaseState, PurchaseTrace};
use crate::allowance::{AllowanceAction, AllowanceLedger};
use crate::chain::ChainAccessor;
use crate::errors::ChainError;
use crate::sponsorship::{SendOutcome, SponsorshipRouter};

/// Ordered approval strategies: the ledger's first choice followed by its
/// legacy fallback, if any. Never more than two entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalPlan {
    steps: [Option<AllowanceAction>; 2],
}

impl ApprovalPlan {
    pub fn new(first: AllowanceAction, ledger: &AllowanceLedger) -> Self {
        if first == AllowanceAction::NoActionNeeded {
            return Self { steps: [None, None] };
        }
        let fallback = ledger.legacy_fallback(&first);
        Self {
            steps: [Some(first), fallback],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps[0].is_none()
    }

    pub fn steps(&self) -> impl Iterator<Item = &AllowanceAction> {
        self.steps.iter().flatten()
    }
}

/// Confirmed approval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReceipt {
    pub action: AllowanceAction,
    pub tx_hash: B256,
    pub sponsored: bool,
    pub sponsor_accepted: bool,
}

/// Approval target
#[derive(Debug, Clone, Copy)]
pub struct ApprovalTarget {
    pub owner: Address,
    pub spender: Address,
    pub token: Address,
    pub estimated_gas: u64,
}

/// Run the plan until one strategy is confirmed on chain. Returns the
/// failure reasons of every attempted strategy when none succeeds.
pub async fn execute_plan(
    plan: &ApprovalPlan,
    target: ApprovalTarget,
    ledger: &AllowanceLedger,
    router: &SponsorshipRouter,
    chain: &dyn ChainAccessor,
    trace: &mut PurchaseTrace,
) -> Result<Option<ApprovalReceipt>, Vec<String>> {
    let mut failures = Vec::new();

    for action in plan.steps() {
        let Some(call) = ledger.prepare(action, target.owner, target.spender, target.token) else {
            continue;
        };

        trace.advance(match action {
            AllowanceAction::ApproveSpendPermission { .. } => PurchaseState::ApprovingSmart,
            _ => PurchaseState::ApprovingLegacy,
        });

        match send_and_confirm(router, chain, call, target.estimated_gas).await {
            Ok(outcome) => {
                tracing::info!(
                    owner = %target.owner,
                    spender = %target.spender,
                    scheme = ?action.scheme(),
                    tx_hash = ?outcome.tx_hash,
                    "Approval confirmed"
                );
                return Ok(Some(ApprovalReceipt {
                    action: *action,
                    tx_hash: outcome.tx_hash,
                    sponsored: outcome.sponsored,
                    sponsor_accepted: outcome.sponsorship.is_accepted(),
                }));
            }
            Err(e) => {
                tracing::warn!(
                    owner = %target.owner,
                    scheme = ?action.scheme(),
                    "Approval attempt failed: {}",
                    e
                );
                failures.push(format!("{:?}: {}", action.scheme(), e));
            }
        }
    }

    if failures.is_empty() {
        Ok(None)
    } else {
        Err(failures)
    }
}

async fn send_and_confirm(
    router: &SponsorshipRouter,
    chain: &dyn ChainAccessor,
    call: crate::chain::PreparedCall,
    estimated_gas: u64,
) -> Result<SendOutcome, ChainError> {
    let outcome = router.try_send(call, estimated_gas).await?;
    let receipt = chain.wait_for_receipt(outcome.tx_hash).await?;
    if !receipt.success {
        return Err(ChainError::ExecutionReverted {
            tx_hash: outcome.tx_hash,
        });
    }
    Ok(outcome)
}
