use std::sync::Arc;

use alloy_primitives::{Address, U256};
use common::amount::TokenAmount;
use common::interfaces::jackpot::IJackpot;
use common::interfaces::jackpot_pool::IJackpotPool;

use super::approval::{execute_plan, ApprovalPlan, ApprovalTarget};
use super::state::{PurchaseState, PurchaseTrace};
use crate::allowance::{AllowanceAction, AllowanceLedger};
use crate::chain::{decode_return, ChainAccessor, ContractCall, PreparedCall, ReadRetry};
use crate::config::JackpotConfig;
use crate::errors::{ChainError, PurchaseError, ReadError};
use crate::sponsorship::{SponsorTransport, SponsorshipRouter};
use crate::types::{receipt_url, PurchaseIntent, PurchaseKind, PurchaseResult};

/// Turns a purchase intent into chain transactions: allowance check,
/// approval if needed, then the ticket purchase itself.
///
/// Built from one configuration snapshot; concurrent purchases share
/// nothing mutable.
pub struct TransactionOrchestrator {
    chain: Arc<dyn ChainAccessor>,
    config: Arc<JackpotConfig>,
    ledger: AllowanceLedger,
    router: SponsorshipRouter,
    retry: ReadRetry,
}

impl TransactionOrchestrator {
    pub fn new(
        chain: Arc<dyn ChainAccessor>,
        config: Arc<JackpotConfig>,
        sponsor: Arc<dyn SponsorTransport>,
    ) -> Self {
        let retry = ReadRetry::from_config(&config);
        Self {
            ledger: AllowanceLedger::new(chain.clone(), &config).with_retry(retry),
            router: SponsorshipRouter::new(chain.clone(), config.sponsorship.clone(), sponsor),
            chain,
            config,
            retry,
        }
    }

    pub fn with_retry(mut self, retry: ReadRetry) -> Self {
        self.ledger = self.ledger.with_retry(retry);
        self.retry = retry;
        self
    }

    pub fn ledger(&self) -> &AllowanceLedger {
        &self.ledger
    }

    pub fn router(&self) -> &SponsorshipRouter {
        &self.router
    }

    /// Contract that pulls the tokens for a purchase of `kind`.
    pub fn spender_for(&self, kind: PurchaseKind) -> Address {
        match kind {
            PurchaseKind::Solo => self.config.contracts.jackpot,
            PurchaseKind::Pool => self.config.contracts.pool,
        }
    }

    /// Price of one ticket in the token's smallest unit.
    pub async fn unit_price(&self) -> Result<U256, ReadError> {
        if let Some(price) = self.config.ticket_price {
            return Ok(price);
        }

        let call = ContractCall::new(self.config.contracts.jackpot, &IJackpot::ticketPriceCall {});
        let chain = &self.chain;
        self.retry
            .run("ticketPrice", || {
                let call = call.clone();
                async move {
                    let data = chain.read(call).await?;
                    decode_return::<IJackpot::ticketPriceCall>(&data)
                }
            })
            .await
    }

    pub async fn purchase(&self, intent: &PurchaseIntent) -> Result<PurchaseResult, PurchaseError> {
        self.purchase_traced(intent).await.0
    }

    /// [`Self::purchase`], also returning the states the purchase went through.
    pub async fn purchase_traced(
        &self,
        intent: &PurchaseIntent,
    ) -> (Result<PurchaseResult, PurchaseError>, PurchaseTrace) {
        let mut trace = PurchaseTrace::new();
        let result = self.run(intent, &mut trace).await;

        if let Err(e) = &result {
            trace.fail();
            tracing::error!(
                kind = %intent.kind,
                tickets = intent.ticket_count,
                "Purchase failed: {}",
                e
            );
        }

        (result, trace)
    }

    async fn run(
        &self,
        intent: &PurchaseIntent,
        trace: &mut PurchaseTrace,
    ) -> Result<PurchaseResult, PurchaseError> {
        intent.validate()?;

        let signer = self.chain.account().ok_or_else(|| {
            PurchaseError::InvalidIntent("no signing account configured".to_string())
        })?;
        let payer = intent.payer.unwrap_or(signer);
        let token = self.config.contracts.token;
        let spender = self.spender_for(intent.kind);

        trace.advance(PurchaseState::CheckingAllowance);

        let price = self.unit_price().await?;
        let required = TokenAmount::from_raw(price, self.config.token_decimals)
            .checked_mul_count(intent.ticket_count)
            .ok_or_else(|| {
                PurchaseError::InvalidIntent(format!(
                    "cost of {} tickets overflows",
                    intent.ticket_count
                ))
            })?;

        tracing::info!(
            kind = %intent.kind,
            tickets = intent.ticket_count,
            payer = %payer,
            cost = %required,
            "Purchasing tickets"
        );

        let action = self
            .ledger
            .ensure_sufficient(payer, spender, token, required.raw())
            .await?;

        if action == AllowanceAction::NoActionNeeded {
            trace.advance(PurchaseState::Skipped);
        } else {
            if payer != signer {
                return Err(PurchaseError::Allowance(format!(
                    "payer {} has insufficient allowance and signer {} cannot approve on its behalf",
                    payer, signer
                )));
            }

            let plan = ApprovalPlan::new(action, &self.ledger);
            let target = ApprovalTarget {
                owner: payer,
                spender,
                token,
                estimated_gas: self.config.gas_limit,
            };
            execute_plan(
                &plan,
                target,
                &self.ledger,
                &self.router,
                self.chain.as_ref(),
                trace,
            )
            .await
            .map_err(|failures| PurchaseError::Allowance(failures.join("; ")))?;
        }

        trace.advance(PurchaseState::Purchasing);

        let call = self.purchase_call(intent)?;
        let outcome = self
            .router
            .try_send(call, self.config.gas_limit)
            .await
            .map_err(PurchaseError::TransactionFailed)?;

        if self.config.confirm_purchases {
            let receipt = self
                .chain
                .wait_for_receipt(outcome.tx_hash)
                .await
                .map_err(PurchaseError::TransactionFailed)?;
            if !receipt.success {
                return Err(PurchaseError::TransactionFailed(
                    ChainError::ExecutionReverted {
                        tx_hash: outcome.tx_hash,
                    },
                ));
            }
        }

        trace.advance(PurchaseState::Settled);

        let result = PurchaseResult {
            tx_hash: outcome.tx_hash,
            kind: intent.kind,
            ticket_count: intent.ticket_count,
            cost_in_smallest_unit: required.raw(),
            pool_id: intent.pool_id,
            sponsored: outcome.sponsored,
            sponsor_accepted: outcome.sponsorship.is_accepted(),
            receipt_url: receipt_url(&self.config.explorer_tx_url, &outcome.tx_hash),
        };

        tracing::info!(
            kind = %result.kind,
            tickets = result.ticket_count,
            tx_hash = ?result.tx_hash,
            sponsor_accepted = result.sponsor_accepted,
            "Purchase settled"
        );

        Ok(result)
    }

    fn purchase_call(&self, intent: &PurchaseIntent) -> Result<PreparedCall, PurchaseError> {
        let ticket_count = U256::from(intent.ticket_count);

        match (intent.kind, intent.pool_id) {
            (PurchaseKind::Solo, _) => Ok(PreparedCall::new(
                self.config.contracts.jackpot,
                &IJackpot::buySoloTicketsCall {
                    ticketCount: ticket_count,
                },
                self.config.gas_limit,
                "buySoloTickets",
            )),
            (PurchaseKind::Pool, Some(pool_id)) => Ok(PreparedCall::new(
                self.config.contracts.pool,
                &IJackpotPool::buyPoolTicketsCall {
                    poolId: pool_id,
                    ticketCount: ticket_count,
                },
                self.config.gas_limit,
                "buyPoolTickets",
            )),
            (PurchaseKind::Pool, None) => Err(PurchaseError::InvalidIntent(
                "pool purchase requires a pool id".to_string(),
            )),
        }
    }
}
