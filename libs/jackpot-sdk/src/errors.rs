//! Error types for the jackpot SDK
//!
//! `ChainError` is what the chain gateway reports. The orchestrator, the
//! scanner and the SDK facade wrap it into their own typed errors so callers
//! can tell a bad intent from a flaky RPC from a failed transaction.

use alloy_primitives::B256;
use thiserror::Error;

/// Errors reported by a [`ChainAccessor`](crate::chain::ChainAccessor).
///
/// Only `Rpc` is transient. A read that reverts reverts again, so
/// `CallReverted` and `Decode` are final.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("call reverted: {0}")]
    CallReverted(String),

    #[error("failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    #[error("no signing account configured")]
    NoSigner,

    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("transaction {tx_hash:?} reverted")]
    ExecutionReverted { tx_hash: B256 },

    #[error("timed out waiting for receipt of {tx_hash:?}")]
    ReceiptTimeout { tx_hash: B256 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ChainError {
    /// Worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::Rpc(_))
    }
}

/// A chain read that kept failing after the retry budget was spent.
#[derive(Debug, Clone, Error)]
#[error("{what} failed after {attempts} attempt(s): {source}")]
pub struct ReadError {
    pub what: &'static str,
    pub attempts: u32,
    #[source]
    pub source: ChainError,
}

/// Failures of a ticket purchase.
#[derive(Debug, Clone, Error)]
pub enum PurchaseError {
    /// Caller error, detected before any chain interaction. Never retried.
    #[error("invalid purchase intent: {0}")]
    InvalidIntent(String),

    /// A read needed to plan the purchase kept failing.
    #[error("chain read failed: {0}")]
    ChainRead(#[from] ReadError),

    /// Every approval strategy was tried and none was confirmed.
    #[error("allowance could not be granted: {0}")]
    Allowance(String),

    /// Submission or on-chain execution failed. Never retried.
    #[error("transaction failed: {0}")]
    TransactionFailed(#[source] ChainError),
}

/// Failures of the historical settlement scan. No partial result is ever
/// returned alongside one of these.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    #[error("failed to read latest block: {0}")]
    BlockNumber(#[source] ChainError),

    #[error("failed to fetch logs for blocks {from_block}..={to_block}: {source}")]
    Window {
        from_block: u64,
        to_block: u64,
        #[source]
        source: ChainError,
    },

    #[error("failed to decode settlement log at block {block_number:?}: {reason}")]
    Decode {
        block_number: Option<u64>,
        reason: String,
    },
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Errors raised while constructing or reconfiguring the SDK.
#[derive(Debug, Error)]
pub enum SdkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_error_display() {
        let error = ReadError {
            what: "allowance",
            attempts: 3,
            source: ChainError::Rpc("connection refused".to_string()),
        };
        let display = error.to_string();
        assert!(display.contains("allowance"));
        assert!(display.contains("3 attempt"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn test_only_rpc_errors_are_transient() {
        assert!(ChainError::Rpc("503".to_string()).is_transient());
        assert!(!ChainError::CallReverted("unsupported".to_string()).is_transient());
        assert!(!ChainError::Decode {
            what: "ticketPrice()",
            reason: "short buffer".to_string(),
        }
        .is_transient());
        assert!(!ChainError::Submission("nonce too low".to_string()).is_transient());
    }

    #[test]
    fn test_purchase_error_from_read_error() {
        let error: PurchaseError = ReadError {
            what: "ticketPrice",
            attempts: 1,
            source: ChainError::Rpc("timeout".to_string()),
        }
        .into();
        assert!(matches!(error, PurchaseError::ChainRead(_)));
    }

    #[test]
    fn test_scan_error_display() {
        let error = ScanError::Window {
            from_block: 95_001,
            to_block: 100_000,
            source: ChainError::Rpc("503".to_string()),
        };
        let display = error.to_string();
        assert!(display.contains("95001..=100000"));
        assert!(display.contains("503"));
    }
}
