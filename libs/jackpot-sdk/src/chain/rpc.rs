use std::time::Duration;

use alloy::network::EthereumWallet;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy_primitives::{Address, Bytes, B256};

use super::accessor::{ChainAccessor, ContractCall, LogQuery, PreparedCall, TxReceipt};
use crate::errors::ChainError;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// [`ChainAccessor`] backed by a JSON-RPC node.
pub struct AlloyChain {
    provider: DynProvider,
    account: Option<Address>,
    receipt_timeout: Duration,
}

impl AlloyChain {
    /// Sign locally with a private key.
    pub fn with_private_key(rpc_url: &str, private_key: &str) -> Result<Self, ChainError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|_| ChainError::InvalidConfig("malformed private key".to_string()))?;
        let account = signer.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(parse_url(rpc_url)?)
            .erased();

        Ok(Self::new(provider, Some(account)))
    }

    /// Let the node sign for an account it manages (`eth_sendTransaction`).
    pub fn with_node_account(rpc_url: &str, account: Address) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new()
            .connect_http(parse_url(rpc_url)?)
            .erased();
        Ok(Self::new(provider, Some(account)))
    }

    /// No account: reads and log queries only.
    pub fn read_only(rpc_url: &str) -> Result<Self, ChainError> {
        let provider = ProviderBuilder::new()
            .connect_http(parse_url(rpc_url)?)
            .erased();
        Ok(Self::new(provider, None))
    }

    pub fn new(provider: DynProvider, account: Option<Address>) -> Self {
        Self {
            provider,
            account,
            receipt_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }
}

fn parse_url(rpc_url: &str) -> Result<alloy::transports::http::reqwest::Url, ChainError> {
    rpc_url
        .parse()
        .map_err(|e| ChainError::InvalidConfig(format!("invalid RPC URL '{}': {}", rpc_url, e)))
}

/// Node-reported reverts (JSON-RPC code 3, or the geth message) are final;
/// everything else is a transport problem.
fn read_error(e: alloy::transports::TransportError) -> ChainError {
    match e.as_error_resp() {
        Some(payload) if payload.code == 3 || payload.message.contains("execution reverted") => {
            ChainError::CallReverted(payload.message.to_string())
        }
        _ => ChainError::Rpc(e.to_string()),
    }
}

#[async_trait::async_trait]
impl ChainAccessor for AlloyChain {
    fn account(&self) -> Option<Address> {
        self.account
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn read(&self, call: ContractCall) -> Result<Bytes, ChainError> {
        let mut tx = TransactionRequest::default().to(call.to).input(call.input.into());
        if let Some(from) = call.from {
            tx = tx.from(from);
        }

        self.provider.call(tx).await.map_err(read_error)
    }

    async fn send(&self, call: PreparedCall) -> Result<B256, ChainError> {
        let from = self.account.ok_or(ChainError::NoSigner)?;

        let tx = TransactionRequest::default()
            .from(from)
            .to(call.to)
            .input(call.input.into())
            .value(call.value)
            .gas_limit(call.gas_limit);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::Submission(e.to_string()))?;
        let tx_hash = *pending.tx_hash();

        tracing::debug!(label = call.label, to = %call.to, tx_hash = ?tx_hash, "Transaction sent");

        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt, ChainError> {
        let deadline = tokio::time::Instant::now() + self.receipt_timeout;

        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| ChainError::Rpc(e.to_string()))?;

            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    tx_hash,
                    block_number: receipt.block_number.unwrap_or_default(),
                    gas_used: receipt.gas_used,
                    success: receipt.status(),
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ChainError::ReceiptTimeout { tx_hash });
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }

    async fn logs(&self, query: LogQuery) -> Result<Vec<Log>, ChainError> {
        let filter = Filter::new()
            .address(query.address)
            .event_signature(query.event_signature)
            .from_block(query.from_block)
            .to_block(query.to_block);

        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_private_key() {
        let result = AlloyChain::with_private_key("http://localhost:8545", "not-a-key");
        assert!(matches!(result, Err(ChainError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_rpc_url() {
        let result = AlloyChain::read_only("not a url");
        assert!(matches!(result, Err(ChainError::InvalidConfig(_))));
    }

    #[test]
    fn test_private_key_account() {
        // well-known dev key (anvil account 0)
        let chain = AlloyChain::with_private_key(
            "http://localhost:8545",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        assert_eq!(
            chain.account(),
            Some(
                "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                    .parse::<Address>()
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_read_error_classification() {
        use alloy::rpc::json_rpc::ErrorPayload;
        use alloy::transports::{TransportError, TransportErrorKind};

        let reverted = TransportError::ErrorResp(ErrorPayload {
            code: 3,
            message: "execution reverted".into(),
            data: None,
        });
        assert!(matches!(read_error(reverted), ChainError::CallReverted(_)));

        let geth_style = TransportError::ErrorResp(ErrorPayload {
            code: -32000,
            message: "execution reverted: unsupported".into(),
            data: None,
        });
        assert!(matches!(read_error(geth_style), ChainError::CallReverted(_)));

        let rate_limited = TransportError::ErrorResp(ErrorPayload {
            code: 429,
            message: "too many requests".into(),
            data: None,
        });
        assert!(matches!(read_error(rate_limited), ChainError::Rpc(_)));

        let refused = TransportErrorKind::custom_str("connection refused");
        assert!(matches!(read_error(refused), ChainError::Rpc(_)));
    }

    #[test]
    fn test_read_only_has_no_account() {
        let chain = AlloyChain::read_only("http://localhost:8545").unwrap();
        assert_eq!(chain.account(), None);
    }
}
