use alloy::rpc::types::Log;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::SolCall;

use crate::errors::ChainError;

/// Read-only contract call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub input: Bytes,
    /// `msg.sender` for the call, if it matters to the contract.
    pub from: Option<Address>,
}

impl ContractCall {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            to,
            input: call.abi_encode().into(),
            from: None,
        }
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }
}

/// State-changing call ready to be sent from the accessor's account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub to: Address,
    pub input: Bytes,
    pub value: U256,
    pub gas_limit: u64,
    /// Short name used in logs, e.g. `"approve"`.
    pub label: &'static str,
}

impl PreparedCall {
    pub fn new<C: SolCall>(to: Address, call: &C, gas_limit: u64, label: &'static str) -> Self {
        Self {
            to,
            input: call.abi_encode().into(),
            value: U256::ZERO,
            gas_limit,
            label,
        }
    }
}

/// Log filter for a single event on a single contract over an inclusive
/// block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub event_signature: B256,
    pub from_block: u64,
    pub to_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    pub success: bool,
}

/// Gateway to the chain. Everything the SDK knows about the chain goes
/// through this trait, so a simulated implementation can stand in for a
/// node in tests.
#[async_trait::async_trait]
pub trait ChainAccessor: Send + Sync {
    /// Account transactions are sent from, if the accessor can sign.
    fn account(&self) -> Option<Address>;

    async fn block_number(&self) -> Result<u64, ChainError>;

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError>;

    /// Execute a call against the latest state. Reverts surface as errors.
    async fn read(&self, call: ContractCall) -> Result<Bytes, ChainError>;

    /// Submit a transaction and return its hash without waiting for
    /// inclusion.
    async fn send(&self, call: PreparedCall) -> Result<B256, ChainError>;

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError>;

    /// Logs matching the query, in provider order.
    async fn logs(&self, query: LogQuery) -> Result<Vec<Log>, ChainError>;
}

/// Decode the return data of `C`.
pub fn decode_return<C: SolCall>(data: &[u8]) -> Result<C::Return, ChainError> {
    C::abi_decode_returns(data).map_err(|e| ChainError::Decode {
        what: C::SIGNATURE,
        reason: e.to_string(),
    })
}
