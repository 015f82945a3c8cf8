use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;

use super::accessor::ChainAccessor;
use super::rpc::AlloyChain;
use crate::config::JackpotConfig;
use crate::errors::ChainError;

/// Where the SDK gets its chain access and signing account from.
///
/// Resolved once by [`WalletSource::connect`]; nothing downstream knows which
/// flavor was used.
#[derive(Clone)]
pub enum WalletSource {
    /// Local key. `rpc_url` falls back to the configured RPC URL.
    PrivateKey {
        private_key: String,
        rpc_url: Option<String>,
    },
    /// Account managed by the node, signed through `eth_sendTransaction`.
    NodeAccount {
        account: Address,
        rpc_url: Option<String>,
    },
    ReadOnly { rpc_url: Option<String> },
    /// Caller-provided gateway, used as is.
    Custom(Arc<dyn ChainAccessor>),
}

impl WalletSource {
    pub fn connect(self, config: &JackpotConfig) -> Result<Arc<dyn ChainAccessor>, ChainError> {
        let receipt_timeout = Duration::from_secs(config.receipt_timeout_secs);
        let url_or_default = |url: Option<String>| url.unwrap_or_else(|| config.rpc_url.clone());

        let accessor: Arc<dyn ChainAccessor> = match self {
            WalletSource::PrivateKey {
                private_key,
                rpc_url,
            } => {
                let chain = AlloyChain::with_private_key(&url_or_default(rpc_url), &private_key)?;
                tracing::info!(account = ?chain.account(), "Connected with local signer");
                Arc::new(chain.with_receipt_timeout(receipt_timeout))
            }
            WalletSource::NodeAccount { account, rpc_url } => {
                let chain = AlloyChain::with_node_account(&url_or_default(rpc_url), account)?;
                tracing::info!(account = %account, "Connected with node-managed account");
                Arc::new(chain.with_receipt_timeout(receipt_timeout))
            }
            WalletSource::ReadOnly { rpc_url } => {
                let chain = AlloyChain::read_only(&url_or_default(rpc_url))?;
                tracing::info!("Connected read-only");
                Arc::new(chain.with_receipt_timeout(receipt_timeout))
            }
            WalletSource::Custom(accessor) => accessor,
        };

        Ok(accessor)
    }
}

impl core::fmt::Debug for WalletSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            WalletSource::PrivateKey { rpc_url, .. } => f
                .debug_struct("PrivateKey")
                .field("private_key", &"<redacted>")
                .field("rpc_url", rpc_url)
                .finish(),
            WalletSource::NodeAccount { account, rpc_url } => f
                .debug_struct("NodeAccount")
                .field("account", account)
                .field("rpc_url", rpc_url)
                .finish(),
            WalletSource::ReadOnly { rpc_url } => {
                f.debug_struct("ReadOnly").field("rpc_url", rpc_url).finish()
            }
            WalletSource::Custom(accessor) => f
                .debug_tuple("Custom")
                .field(&accessor.account())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SimulatedChain;

    #[test]
    fn test_debug_hides_private_key() {
        let source = WalletSource::PrivateKey {
            private_key: "0xdeadbeef".to_string(),
            rpc_url: None,
        };
        let debug = format!("{:?}", source);
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_connect_custom_passes_through() {
        let chain = Arc::new(SimulatedChain::new(Address::repeat_byte(9)));
        let accessor = WalletSource::Custom(chain)
            .connect(&JackpotConfig::default())
            .unwrap();
        assert_eq!(accessor.account(), Some(Address::repeat_byte(9)));
    }

    #[test]
    fn test_connect_read_only_uses_config_url() {
        let accessor = WalletSource::ReadOnly { rpc_url: None }
            .connect(&JackpotConfig::default())
            .unwrap();
        assert_eq!(accessor.account(), None);
    }
}
