//! In-memory chain for tests and dry runs.
//!
//! Answers the jackpot, pool, token and spend-permission calls from a small
//! state table, records every interaction and lets a test make individual
//! calls fail.

use std::collections::{HashMap, HashSet};

use alloy::rpc::types::Log;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent, SolValue};
use common::interfaces::erc20::IERC20;
use common::interfaces::jackpot::IJackpot;
use common::interfaces::jackpot_pool::IJackpotPool;
use common::interfaces::spend_permission_manager::ISpendPermissionManager;
use parking_lot::Mutex;

use super::accessor::{ChainAccessor, ContractCall, LogQuery, PreparedCall, TxReceipt};
use crate::errors::ChainError;

/// Pool state served by `getPoolInfo`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedPool {
    pub total_tickets: U256,
    pub ticket_price: U256,
    pub max_tickets_per_user: U256,
    pub end_time: U256,
    pub is_active: bool,
}

/// Round participation served by `usersInfo`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedUser {
    pub tickets_purchased_total_bps: U256,
    pub winnings_claimable: U256,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendFailure {
    /// Rejected at submission
    Reject,
    /// Accepted, mined with a failed status
    Revert,
}

#[derive(Default)]
struct Failures {
    reads: HashMap<[u8; 4], u32>,
    sends: HashMap<[u8; 4], (SendFailure, u32)>,
    log_queries: HashSet<usize>,
    code_lookup: bool,
    block_number: bool,
}

struct State {
    block_number: u64,
    code: HashMap<Address, Bytes>,
    token_decimals: u8,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    spend_permissions: HashMap<(Address, Address, Address), U256>,
    spend_permission_supported: bool,
    ticket_price: U256,
    lp_pool_total: U256,
    user_pool_total: U256,
    last_jackpot_end_time: U256,
    round_duration: U256,
    fee_bps: U256,
    token_name: String,
    token_symbol: String,
    users_info: HashMap<Address, SimulatedUser>,
    solo_tickets: HashMap<Address, U256>,
    pools: HashMap<U256, SimulatedPool>,
    pool_tickets: HashMap<(U256, Address), U256>,
    logs: Vec<Log>,
    receipts: HashMap<B256, TxReceipt>,
    nonce: u64,
    failures: Failures,
    reads: Vec<ContractCall>,
    sends: Vec<PreparedCall>,
    /// Every `send`, including the ones rejected at submission
    send_attempts: Vec<&'static str>,
    log_queries: Vec<LogQuery>,
    chain_calls: usize,
}

/// Simulated [`ChainAccessor`]
pub struct SimulatedChain {
    account: Option<Address>,
    state: Mutex<State>,
}

impl SimulatedChain {
    /// Chain with `account` as the signer. The ticket price starts at one
    /// token (1_000_000 with 6 decimals).
    pub fn new(account: Address) -> Self {
        Self::build(Some(account))
    }

    pub fn read_only() -> Self {
        Self::build(None)
    }

    fn build(account: Option<Address>) -> Self {
        Self {
            account,
            state: Mutex::new(State {
                block_number: 0,
                code: HashMap::new(),
                token_decimals: 6,
                balances: HashMap::new(),
                allowances: HashMap::new(),
                spend_permissions: HashMap::new(),
                spend_permission_supported: true,
                ticket_price: U256::from(1_000_000u64),
                lp_pool_total: U256::ZERO,
                user_pool_total: U256::ZERO,
                last_jackpot_end_time: U256::ZERO,
                round_duration: U256::from(86_400u64),
                fee_bps: U256::ZERO,
                token_name: "USD Coin".to_string(),
                token_symbol: "USDC".to_string(),
                users_info: HashMap::new(),
                solo_tickets: HashMap::new(),
                pools: HashMap::new(),
                pool_tickets: HashMap::new(),
                logs: Vec::new(),
                receipts: HashMap::new(),
                nonce: 0,
                failures: Failures::default(),
                reads: Vec::new(),
                sends: Vec::new(),
                send_attempts: Vec::new(),
                log_queries: Vec::new(),
                chain_calls: 0,
            }),
        }
    }

    // --- state setup ---

    pub fn set_block_number(&self, block_number: u64) {
        self.state.lock().block_number = block_number;
    }

    /// Give `address` contract code so it reads as a smart wallet.
    pub fn make_smart_wallet(&self, address: Address) {
        self.state
            .lock()
            .code
            .insert(address, Bytes::from_static(&[0x60, 0x80, 0x60, 0x40]));
    }

    pub fn set_ticket_price(&self, price: U256) {
        self.state.lock().ticket_price = price;
    }

    pub fn set_token_decimals(&self, decimals: u8) {
        self.state.lock().token_decimals = decimals;
    }

    pub fn set_token_metadata(&self, name: &str, symbol: &str) {
        let mut state = self.state.lock();
        state.token_name = name.to_string();
        state.token_symbol = symbol.to_string();
    }

    pub fn set_user_info(&self, user: Address, info: SimulatedUser) {
        self.state.lock().users_info.insert(user, info);
    }

    pub fn set_balance(&self, owner: Address, amount: U256) {
        self.state.lock().balances.insert(owner, amount);
    }

    pub fn set_allowance(&self, owner: Address, spender: Address, amount: U256) {
        self.state.lock().allowances.insert((owner, spender), amount);
    }

    pub fn set_spend_permission(
        &self,
        account: Address,
        spender: Address,
        token: Address,
        amount: U256,
    ) {
        self.state
            .lock()
            .spend_permissions
            .insert((account, spender, token), amount);
    }

    /// When unsupported, every spend-permission call reverts.
    pub fn set_spend_permission_supported(&self, supported: bool) {
        self.state.lock().spend_permission_supported = supported;
    }

    pub fn set_jackpot_state(
        &self,
        lp_pool_total: U256,
        user_pool_total: U256,
        last_jackpot_end_time: U256,
        round_duration: U256,
        fee_bps: U256,
    ) {
        let mut state = self.state.lock();
        state.lp_pool_total = lp_pool_total;
        state.user_pool_total = user_pool_total;
        state.last_jackpot_end_time = last_jackpot_end_time;
        state.round_duration = round_duration;
        state.fee_bps = fee_bps;
    }

    pub fn add_pool(&self, pool_id: U256, pool: SimulatedPool) {
        self.state.lock().pools.insert(pool_id, pool);
    }

    pub fn set_pool_tickets(&self, pool_id: U256, holder: Address, tickets: U256) {
        self.state.lock().pool_tickets.insert((pool_id, holder), tickets);
    }

    /// Emit a `JackpotRun` log from `address` at the given position.
    pub fn push_settlement(
        &self,
        address: Address,
        event: IJackpot::JackpotRun,
        block_number: u64,
        log_index: u64,
    ) {
        self.push_log(Log {
            inner: alloy_primitives::Log {
                address,
                data: event.encode_log_data(),
            },
            block_number: Some(block_number),
            log_index: Some(log_index),
            ..Default::default()
        });
    }

    pub fn push_log(&self, log: Log) {
        self.state.lock().logs.push(log);
    }

    // --- failure injection ---

    /// Fail the next `times` reads of `selector` with an RPC error.
    pub fn fail_reads(&self, selector: [u8; 4], times: u32) {
        self.state.lock().failures.reads.insert(selector, times);
    }

    /// Reject the next `times` submissions of `selector`.
    pub fn fail_sends(&self, selector: [u8; 4], times: u32) {
        self.state
            .lock()
            .failures
            .sends
            .insert(selector, (SendFailure::Reject, times));
    }

    /// Mine the next `times` transactions of `selector` with a failed status.
    pub fn revert_sends(&self, selector: [u8; 4], times: u32) {
        self.state
            .lock()
            .failures
            .sends
            .insert(selector, (SendFailure::Revert, times));
    }

    /// Fail the log query with the given zero-based position.
    pub fn fail_log_query(&self, index: usize) {
        self.state.lock().failures.log_queries.insert(index);
    }

    pub fn fail_code_lookup(&self) {
        self.state.lock().failures.code_lookup = true;
    }

    pub fn fail_block_number(&self) {
        self.state.lock().failures.block_number = true;
    }

    // --- inspection ---

    pub fn reads(&self) -> Vec<ContractCall> {
        self.state.lock().reads.clone()
    }

    pub fn sends(&self) -> Vec<PreparedCall> {
        self.state.lock().sends.clone()
    }

    /// Labels of submitted transactions, in order.
    pub fn sent_labels(&self) -> Vec<&'static str> {
        self.state.lock().sends.iter().map(|s| s.label).collect()
    }

    /// Labels of every submission attempt, rejected ones included.
    pub fn attempted_labels(&self) -> Vec<&'static str> {
        self.state.lock().send_attempts.clone()
    }

    pub fn log_queries(&self) -> Vec<LogQuery> {
        self.state.lock().log_queries.clone()
    }

    /// Every call made through the [`ChainAccessor`] interface.
    pub fn chain_calls(&self) -> usize {
        self.state.lock().chain_calls
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.state
            .lock()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn spend_permission(&self, account: Address, spender: Address, token: Address) -> U256 {
        self.state
            .lock()
            .spend_permissions
            .get(&(account, spender, token))
            .copied()
            .unwrap_or_default()
    }

    pub fn solo_tickets(&self, holder: Address) -> U256 {
        self.state
            .lock()
            .solo_tickets
            .get(&holder)
            .copied()
            .unwrap_or_default()
    }

    pub fn pool_tickets(&self, pool_id: U256, holder: Address) -> U256 {
        self.state
            .lock()
            .pool_tickets
            .get(&(pool_id, holder))
            .copied()
            .unwrap_or_default()
    }
}

fn selector_of(input: &[u8]) -> [u8; 4] {
    let mut selector = [0u8; 4];
    if input.len() >= 4 {
        selector.copy_from_slice(&input[..4]);
    }
    selector
}

fn decode_input<C: SolCall>(input: &[u8]) -> Result<C, ChainError> {
    C::abi_decode(input).map_err(|e| ChainError::Decode {
        what: C::SIGNATURE,
        reason: e.to_string(),
    })
}

fn revert(reason: &str) -> ChainError {
    ChainError::CallReverted(reason.to_string())
}

impl State {
    fn take_failure(counter: &mut HashMap<[u8; 4], u32>, selector: [u8; 4]) -> bool {
        match counter.get_mut(&selector) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn answer(&self, call: &ContractCall, caller: Option<Address>) -> Result<Bytes, ChainError> {
        let input = &call.input[..];
        let selector = selector_of(input);

        let encoded = match selector {
            IERC20::nameCall::SELECTOR => (self.token_name.clone(),).abi_encode_params(),
            IERC20::symbolCall::SELECTOR => (self.token_symbol.clone(),).abi_encode_params(),
            IERC20::decimalsCall::SELECTOR => IERC20::decimalsCall::abi_encode_returns(&self.token_decimals),
            IERC20::balanceOfCall::SELECTOR => {
                let c = decode_input::<IERC20::balanceOfCall>(input)?;
                self.balances
                    .get(&c.account)
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            }
            IERC20::allowanceCall::SELECTOR => {
                let c = decode_input::<IERC20::allowanceCall>(input)?;
                self.allowances
                    .get(&(c.owner, c.spender))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            }
            ISpendPermissionManager::getSpendPermissionCall::SELECTOR => {
                if !self.spend_permission_supported {
                    return Err(revert("spend permissions not supported"));
                }
                let c = decode_input::<ISpendPermissionManager::getSpendPermissionCall>(input)?;
                self.spend_permissions
                    .get(&(c.account, c.spender, c.token))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            }
            IJackpot::ticketPriceCall::SELECTOR => self.ticket_price.abi_encode(),
            IJackpot::lpPoolTotalCall::SELECTOR => self.lp_pool_total.abi_encode(),
            IJackpot::userPoolTotalCall::SELECTOR => self.user_pool_total.abi_encode(),
            IJackpot::lastJackpotEndTimeCall::SELECTOR => self.last_jackpot_end_time.abi_encode(),
            IJackpot::roundDurationInSecondsCall::SELECTOR => self.round_duration.abi_encode(),
            IJackpot::feeBpsCall::SELECTOR => self.fee_bps.abi_encode(),
            IJackpot::usersInfoCall::SELECTOR => {
                let c = decode_input::<IJackpot::usersInfoCall>(input)?;
                let info = self.users_info.get(&c.user).copied().unwrap_or_default();
                (
                    info.tickets_purchased_total_bps,
                    info.winnings_claimable,
                    info.active,
                )
                    .abi_encode_params()
            }
            IJackpotPool::getPoolInfoCall::SELECTOR => {
                let c = decode_input::<IJackpotPool::getPoolInfoCall>(input)?;
                let pool = self
                    .pools
                    .get(&c.poolId)
                    .ok_or_else(|| revert("unknown pool"))?;
                (
                    pool.total_tickets,
                    pool.ticket_price,
                    pool.max_tickets_per_user,
                    pool.end_time,
                    pool.is_active,
                )
                    .abi_encode_params()
            }
            IJackpotPool::getUserTicketsCall::SELECTOR => {
                let c = decode_input::<IJackpotPool::getUserTicketsCall>(input)?;
                let holder = caller.ok_or_else(|| revert("no caller"))?;
                self.pool_tickets
                    .get(&(c.poolId, holder))
                    .copied()
                    .unwrap_or_default()
                    .abi_encode()
            }
            _ => return Err(revert("unknown selector")),
        };

        Ok(encoded.into())
    }

    fn apply(&mut self, from: Address, call: &PreparedCall) -> Result<(), ChainError> {
        let input = &call.input[..];

        match selector_of(input) {
            IERC20::approveCall::SELECTOR => {
                let c = decode_input::<IERC20::approveCall>(input)?;
                self.allowances.insert((from, c.spender), c.value);
            }
            ISpendPermissionManager::approveCall::SELECTOR => {
                if !self.spend_permission_supported {
                    return Err(revert("spend permissions not supported"));
                }
                let c = decode_input::<ISpendPermissionManager::approveCall>(input)?;
                self.spend_permissions
                    .insert((c.account, c.spender, c.token), c.allowance);
            }
            ISpendPermissionManager::revokeCall::SELECTOR => {
                let c = decode_input::<ISpendPermissionManager::revokeCall>(input)?;
                self.spend_permissions.remove(&(c.account, c.spender, c.token));
            }
            IJackpot::buySoloTicketsCall::SELECTOR => {
                let c = decode_input::<IJackpot::buySoloTicketsCall>(input)?;
                *self.solo_tickets.entry(from).or_default() += c.ticketCount;
            }
            IJackpotPool::buyPoolTicketsCall::SELECTOR => {
                let c = decode_input::<IJackpotPool::buyPoolTicketsCall>(input)?;
                *self.pool_tickets.entry((c.poolId, from)).or_default() += c.ticketCount;
            }
            _ => return Err(revert("unknown selector")),
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ChainAccessor for SimulatedChain {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let mut state = self.state.lock();
        state.chain_calls += 1;
        if state.failures.block_number {
            return Err(ChainError::Rpc("simulated block number failure".to_string()));
        }
        Ok(state.block_number)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        let mut state = self.state.lock();
        state.chain_calls += 1;
        if state.failures.code_lookup {
            return Err(ChainError::Rpc("simulated code lookup failure".to_string()));
        }
        Ok(state.code.get(&address).cloned().unwrap_or_default())
    }

    async fn read(&self, call: ContractCall) -> Result<Bytes, ChainError> {
        let mut state = self.state.lock();
        state.chain_calls += 1;
        state.reads.push(call.clone());

        let selector = selector_of(&call.input);
        if State::take_failure(&mut state.failures.reads, selector) {
            return Err(ChainError::Rpc("simulated read failure".to_string()));
        }

        state.answer(&call, call.from.or(self.account))
    }

    async fn send(&self, call: PreparedCall) -> Result<B256, ChainError> {
        let mut state = self.state.lock();
        state.chain_calls += 1;
        let from = self.account.ok_or(ChainError::NoSigner)?;
        state.send_attempts.push(call.label);

        let selector = selector_of(&call.input);
        let failure = match state.failures.sends.get_mut(&selector) {
            Some((kind, remaining)) if *remaining > 0 => {
                *remaining -= 1;
                Some(*kind)
            }
            _ => None,
        };
        if failure == Some(SendFailure::Reject) {
            return Err(ChainError::Submission(format!(
                "simulated rejection of {}",
                call.label
            )));
        }

        state.nonce += 1;
        state.block_number += 1;
        let tx_hash = keccak256(state.nonce.to_be_bytes());

        let success = failure.is_none() && state.apply(from, &call).is_ok();
        let receipt = TxReceipt {
            tx_hash,
            block_number: state.block_number,
            gas_used: call.gas_limit.min(21_000 + call.input.len() as u64 * 16),
            success,
        };
        state.receipts.insert(tx_hash, receipt);
        state.sends.push(call.clone());

        tracing::debug!(label = call.label, tx_hash = ?tx_hash, success, "Simulated transaction");

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError> {
        let mut state = self.state.lock();
        state.chain_calls += 1;
        state
            .receipts
            .get(&tx_hash)
            .cloned()
            .ok_or(ChainError::ReceiptTimeout { tx_hash })
    }

    async fn logs(&self, query: LogQuery) -> Result<Vec<Log>, ChainError> {
        let mut state = self.state.lock();
        state.chain_calls += 1;
        let position = state.log_queries.len();
        state.log_queries.push(query);

        if state.failures.log_queries.contains(&position) {
            return Err(ChainError::Rpc(format!(
                "simulated log query failure for {}..={}",
                query.from_block, query.to_block
            )));
        }

        let matching = state
            .logs
            .iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                log.inner.address == query.address
                    && log.inner.data.topics().first() == Some(&query.event_signature)
                    && block >= query.from_block
                    && block <= query.to_block
            })
            .cloned()
            .collect();

        Ok(matching)
    }
}
