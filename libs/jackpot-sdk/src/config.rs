use std::path::Path;

use alloy_primitives::{address, Address, U256};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

pub const BASE_CHAIN_ID: u64 = 8453;
pub const BASE_MAINNET_RPC_URL: &str = "https://mainnet.base.org";
pub const DEFAULT_DATA_API_URL: &str = "https://api.megapot.io";
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://basescan.org/tx/";

pub const DEFAULT_GAS_LIMIT: u64 = 150_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_SPONSOR_MAX_GAS: u64 = 50_000;
pub const DEFAULT_SPEND_PERMISSION_PERIOD_DAYS: u32 = 30;

/// Deployed contract addresses the SDK talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    /// Stablecoin used to pay for tickets
    pub token: Address,
    /// Jackpot contract (solo tickets, round settlement events)
    pub jackpot: Address,
    /// Jackpot pool contract (pool tickets)
    pub pool: Address,
    pub spend_permission_manager: Address,
    pub referrer: Address,
}

impl Default for ContractAddresses {
    fn default() -> Self {
        Self {
            token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            jackpot: address!("bEDd4F2beBE9E3E636161E644759f3cbe3d51B95"),
            pool: address!("fb324c09c16b5f437ff612a4e8bc95b8fd6e6d5a"),
            spend_permission_manager: address!("f85210B21cC50302F477BA56686d2019dC9b67Ad"),
            referrer: address!("a14ce36e7b135b66c3e3cb2584e777f32b15f5dc"),
        }
    }
}

/// Gas sponsorship (paymaster) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorshipConfig {
    /// No endpoint means sponsorship is never attempted.
    pub endpoint_url: Option<String>,
    /// Calls estimated above this many gas units are never sponsored
    pub max_gas_units: u64,
    pub enabled: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl SponsorshipConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            max_gas_units: DEFAULT_SPONSOR_MAX_GAS,
            enabled: true,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Endpoint to use, or `None` when sponsorship is off.
    pub fn active_endpoint(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.endpoint_url.as_deref().filter(|url| !url.is_empty())
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Partially specified sponsorship settings, from explicit configuration or
/// from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SponsorshipOverrides {
    pub url: Option<String>,
    pub max_gas_units: Option<u64>,
    pub enabled: Option<bool>,
}

impl SponsorshipOverrides {
    /// Read `PAYMASTER_URL`, `PAYMASTER_ENABLED` and `PAYMASTER_MAX_GAS_LIMIT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("PAYMASTER_URL").ok().filter(|s| !s.is_empty());
        let enabled = std::env::var("PAYMASTER_ENABLED")
            .ok()
            .map(|s| s.eq_ignore_ascii_case("true"));
        let max_gas_units = match std::env::var("PAYMASTER_MAX_GAS_LIMIT") {
            Ok(raw) => Some(raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                name: "PAYMASTER_MAX_GAS_LIMIT",
                reason: format!("{}", e),
            })?),
            Err(_) => None,
        };

        Ok(Self {
            url,
            max_gas_units,
            enabled,
        })
    }
}

/// Combine explicit and environment sponsorship settings.
///
/// An explicit `enabled = false` wins over everything. Without a URL from
/// either source there is no sponsorship at all. Explicit values take
/// precedence over the environment; sponsorship stays disabled unless
/// someone turns it on.
pub fn resolve_sponsorship(
    explicit: &SponsorshipOverrides,
    env: &SponsorshipOverrides,
) -> Option<SponsorshipConfig> {
    if explicit.enabled == Some(false) {
        return None;
    }

    let url = explicit.url.clone().or_else(|| env.url.clone())?;

    Some(SponsorshipConfig {
        endpoint_url: Some(url),
        max_gas_units: explicit
            .max_gas_units
            .or(env.max_gas_units)
            .unwrap_or(DEFAULT_SPONSOR_MAX_GAS),
        enabled: explicit.enabled.or(env.enabled).unwrap_or(false),
        timeout_ms: DEFAULT_TIMEOUT_MS,
    })
}

/// REST data API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DATA_API_URL.to_string(),
            api_key: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Bounds of the backward settlement scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub max_lookback_blocks: u64,
    pub window_blocks: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_lookback_blocks: crate::scanner::MAX_LOOKBACK_BLOCKS,
            window_blocks: crate::scanner::WINDOW_BLOCKS,
        }
    }
}

/// SDK configuration.
///
/// Treated as an immutable value: updates build a new config through
/// [`JackpotConfig::merged`] and replace the old one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JackpotConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub contracts: ContractAddresses,
    /// Gas limit attached to every transaction the SDK sends
    pub gas_limit: u64,
    /// Attempts per chain read before giving up
    pub max_retries: u32,
    /// Base delay between read attempts, doubled on every retry
    pub retry_delay_ms: u64,
    pub token_decimals: u8,
    /// Fixed ticket price in the token's smallest unit. Read from the
    /// jackpot contract when unset.
    pub ticket_price: Option<U256>,
    pub spend_permission_period_days: u32,
    /// Wait for the purchase receipt before reporting success
    pub confirm_purchases: bool,
    pub receipt_timeout_secs: u64,
    pub explorer_tx_url: String,
    pub sponsorship: Option<SponsorshipConfig>,
    pub data_api: DataApiConfig,
    pub scan: ScanSettings,
}

impl Default for JackpotConfig {
    fn default() -> Self {
        Self {
            chain_id: BASE_CHAIN_ID,
            rpc_url: BASE_MAINNET_RPC_URL.to_string(),
            contracts: ContractAddresses::default(),
            gas_limit: DEFAULT_GAS_LIMIT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            token_decimals: common::amount::TokenAmount::USDC_DECIMALS,
            ticket_price: None,
            spend_permission_period_days: DEFAULT_SPEND_PERMISSION_PERIOD_DAYS,
            confirm_purchases: true,
            receipt_timeout_secs: 120,
            explorer_tx_url: DEFAULT_EXPLORER_TX_URL.to_string(),
            sponsorship: None,
            data_api: DataApiConfig::default(),
            scan: ScanSettings::default(),
        }
    }
}

impl JackpotConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `RPC_URL`, `REFERRER_ADDRESS`, `DATA_API_URL`, `DATA_API_KEY`
    /// and the `PAYMASTER_*` variables.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var("RPC_URL") {
            if !url.is_empty() {
                self.rpc_url = url;
            }
        }

        if let Ok(raw) = std::env::var("REFERRER_ADDRESS") {
            self.contracts.referrer = raw.parse().map_err(|e| ConfigError::InvalidValue {
                name: "REFERRER_ADDRESS",
                reason: format!("{}", e),
            })?;
        }

        if let Ok(url) = std::env::var("DATA_API_URL") {
            self.data_api.base_url = url;
        }
        if let Ok(key) = std::env::var("DATA_API_KEY") {
            self.data_api.api_key = Some(key);
        }

        let explicit = match &self.sponsorship {
            Some(current) => SponsorshipOverrides {
                url: current.endpoint_url.clone(),
                max_gas_units: Some(current.max_gas_units),
                enabled: Some(current.enabled),
            },
            None => SponsorshipOverrides::default(),
        };
        let timeout_ms = self
            .sponsorship
            .as_ref()
            .map(|s| s.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        self.sponsorship = resolve_sponsorship(&explicit, &SponsorshipOverrides::from_env()?)
            .map(|s| SponsorshipConfig { timeout_ms, ..s });

        Ok(self)
    }

    /// A new config with every field set in `update` replaced. Fields left
    /// as `None` keep their current value.
    pub fn merged(&self, update: &ConfigUpdate) -> Self {
        let mut next = self.clone();

        if let Some(token) = update.token {
            next.contracts.token = token;
        }
        if let Some(jackpot) = update.jackpot {
            next.contracts.jackpot = jackpot;
        }
        if let Some(pool) = update.pool {
            next.contracts.pool = pool;
        }
        if let Some(manager) = update.spend_permission_manager {
            next.contracts.spend_permission_manager = manager;
        }
        if let Some(referrer) = update.referrer {
            next.contracts.referrer = referrer;
        }
        if let Some(gas_limit) = update.gas_limit {
            next.gas_limit = gas_limit;
        }
        if let Some(max_retries) = update.max_retries {
            next.max_retries = max_retries;
        }
        if let Some(retry_delay_ms) = update.retry_delay_ms {
            next.retry_delay_ms = retry_delay_ms;
        }
        if let Some(decimals) = update.token_decimals {
            next.token_decimals = decimals;
        }
        if let Some(period_days) = update.spend_permission_period_days {
            next.spend_permission_period_days = period_days;
        }
        if let Some(ticket_price) = update.ticket_price {
            next.ticket_price = Some(ticket_price);
        }
        if let Some(confirm) = update.confirm_purchases {
            next.confirm_purchases = confirm;
        }
        if let Some(sponsorship) = &update.sponsorship {
            next.sponsorship = Some(sponsorship.clone());
        }
        if let Some(data_api) = &update.data_api {
            next.data_api = data_api.clone();
        }
        if let Some(explorer_tx_url) = &update.explorer_tx_url {
            next.explorer_tx_url = explorer_tx_url.clone();
        }
        if let Some(scan) = update.scan {
            next.scan = scan;
        }

        next
    }
}

/// Merge-style configuration update. See [`JackpotConfig::merged`].
///
/// The chain connection (`rpc_url`, `chain_id`, `receipt_timeout_secs`) is
/// fixed when the SDK is built and cannot be changed here; build a new
/// [`JackpotSdk`](crate::JackpotSdk) to switch networks.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub token: Option<Address>,
    pub jackpot: Option<Address>,
    pub pool: Option<Address>,
    pub spend_permission_manager: Option<Address>,
    pub referrer: Option<Address>,
    pub gas_limit: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub token_decimals: Option<u8>,
    pub spend_permission_period_days: Option<u32>,
    pub ticket_price: Option<U256>,
    pub confirm_purchases: Option<bool>,
    pub sponsorship: Option<SponsorshipConfig>,
    pub data_api: Option<DataApiConfig>,
    pub explorer_tx_url: Option<String>,
    pub scan: Option<ScanSettings>,
}
