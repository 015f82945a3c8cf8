use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use parking_lot::RwLock;

use crate::allowance::{AllowanceAction, AllowanceLedger, AuthorizationRecord, SpendPermission};
use crate::chain::{ChainAccessor, WalletSource};
use crate::config::{ConfigUpdate, JackpotConfig, DEFAULT_TIMEOUT_MS};
use crate::data_api::DataApiClient;
use crate::errors::{ChainError, PurchaseError, ReadError, ScanError, SdkError};
use crate::jackpot::{JackpotOverview, JackpotReader, PoolInfo, UserInfo};
use crate::orchestrator::{
    execute_plan, ApprovalPlan, ApprovalReceipt, ApprovalTarget, PurchaseState, PurchaseTrace,
    TransactionOrchestrator,
};
use crate::scanner::{HistoricalEventScanner, SettlementEvent};
use crate::sponsorship::{HttpSponsor, SponsorTransport, SponsorshipRouter};
use crate::types::{receipt_url, PurchaseIntent, PurchaseResult};

/// Everything derived from one configuration value. Replaced as a whole on
/// update.
struct SdkState {
    config: Arc<JackpotConfig>,
    data_api: DataApiClient,
    sponsor: Arc<dyn SponsorTransport>,
}

impl SdkState {
    fn build(
        config: JackpotConfig,
        sponsor_override: Option<&Arc<dyn SponsorTransport>>,
    ) -> Result<Self, SdkError> {
        let sponsor: Arc<dyn SponsorTransport> = match sponsor_override {
            Some(sponsor) => sponsor.clone(),
            None => {
                let timeout_ms = config
                    .sponsorship
                    .as_ref()
                    .map(|s| s.timeout_ms)
                    .unwrap_or(DEFAULT_TIMEOUT_MS);
                Arc::new(HttpSponsor::new(Duration::from_millis(timeout_ms))?)
            }
        };

        Ok(Self {
            data_api: DataApiClient::new(&config.data_api)?,
            config: Arc::new(config),
            sponsor,
        })
    }
}

/// Entry point: ticket purchases, allowance management, jackpot reads and
/// round history over a single chain connection.
pub struct JackpotSdk {
    chain: Arc<dyn ChainAccessor>,
    state: RwLock<Arc<SdkState>>,
    sponsor_override: Option<Arc<dyn SponsorTransport>>,
}

impl JackpotSdk {
    pub fn new(config: JackpotConfig, wallet: WalletSource) -> Result<Self, SdkError> {
        tracing::info!(chain_id = config.chain_id, wallet = ?wallet, "Initializing jackpot SDK");
        let chain = wallet.connect(&config)?;
        let state = SdkState::build(config, None)?;

        Ok(Self {
            chain,
            state: RwLock::new(Arc::new(state)),
            sponsor_override: None,
        })
    }

    /// Use `sponsor` for all sponsorship requests instead of HTTP.
    pub fn with_sponsor_transport(mut self, sponsor: Arc<dyn SponsorTransport>) -> Self {
        let current = self.snapshot();
        *self.state.write() = Arc::new(SdkState {
            config: current.config.clone(),
            data_api: current.data_api.clone(),
            sponsor: sponsor.clone(),
        });
        self.sponsor_override = Some(sponsor);
        self
    }

    fn snapshot(&self) -> Arc<SdkState> {
        self.state.read().clone()
    }

    pub fn config(&self) -> Arc<JackpotConfig> {
        self.snapshot().config.clone()
    }

    /// Apply `update` on top of the current configuration. Operations already
    /// running keep the configuration they started with. The chain
    /// connection is kept as built.
    pub fn update_config(&self, update: &ConfigUpdate) -> Result<(), SdkError> {
        let next = self.config().merged(update);
        let state = SdkState::build(next, self.sponsor_override.as_ref())?;
        *self.state.write() = Arc::new(state);
        tracing::info!("Configuration updated");
        Ok(())
    }

    pub fn account(&self) -> Option<Address> {
        self.chain.account()
    }

    pub fn chain(&self) -> Arc<dyn ChainAccessor> {
        self.chain.clone()
    }

    pub fn data_api(&self) -> DataApiClient {
        self.snapshot().data_api.clone()
    }

    pub fn receipt_url(&self, tx_hash: &B256) -> String {
        receipt_url(&self.config().explorer_tx_url, tx_hash)
    }

    // --- purchases ---

    pub fn orchestrator(&self) -> TransactionOrchestrator {
        let state = self.snapshot();
        TransactionOrchestrator::new(self.chain.clone(), state.config.clone(), state.sponsor.clone())
    }

    pub async fn purchase(&self, intent: &PurchaseIntent) -> Result<PurchaseResult, PurchaseError> {
        self.orchestrator().purchase(intent).await
    }

    pub async fn buy_solo_tickets(&self, ticket_count: u64) -> Result<PurchaseResult, PurchaseError> {
        self.purchase(&PurchaseIntent::solo(ticket_count)).await
    }

    pub async fn buy_pool_tickets(
        &self,
        pool_id: U256,
        ticket_count: u64,
    ) -> Result<PurchaseResult, PurchaseError> {
        self.purchase(&PurchaseIntent::pool(pool_id, ticket_count)).await
    }

    // --- allowances ---

    fn ledger(&self, config: &JackpotConfig) -> AllowanceLedger {
        AllowanceLedger::new(self.chain.clone(), config)
    }

    fn router(&self, state: &SdkState) -> SponsorshipRouter {
        SponsorshipRouter::new(
            self.chain.clone(),
            state.config.sponsorship.clone(),
            state.sponsor.clone(),
        )
    }

    pub async fn is_smart_wallet(&self, owner: Address) -> bool {
        self.ledger(&self.config()).is_smart_wallet(owner).await
    }

    /// Non-zero authorizations `owner` has granted `spender` (the jackpot
    /// contract by default) over the payment token.
    pub async fn user_allowances(
        &self,
        owner: Address,
        spender: Option<Address>,
    ) -> Result<Vec<AuthorizationRecord>, ReadError> {
        let config = self.config();
        let spender = spender.unwrap_or(config.contracts.jackpot);
        self.ledger(&config)
            .current_authorization(owner, spender, config.contracts.token)
            .await
    }

    /// Grant `spender` (the jackpot contract by default) `amount` of the
    /// payment token from the signing account. Smart wallets get a spend
    /// permission first and fall back to a plain approval.
    pub async fn approve_token(
        &self,
        spender: Option<Address>,
        amount: U256,
    ) -> Result<ApprovalReceipt, PurchaseError> {
        let state = self.snapshot();
        let config = &state.config;
        let owner = self.chain.account().ok_or_else(|| {
            PurchaseError::InvalidIntent("no signing account configured".to_string())
        })?;
        let spender = spender.unwrap_or(config.contracts.jackpot);

        let ledger = self.ledger(config);
        let action = if ledger.is_smart_wallet(owner).await {
            AllowanceAction::ApproveSpendPermission {
                amount,
                period_days: config.spend_permission_period_days,
            }
        } else {
            AllowanceAction::ApproveLegacy { amount }
        };

        let mut trace = PurchaseTrace::new();
        trace.advance(PurchaseState::CheckingAllowance);

        let plan = ApprovalPlan::new(action, &ledger);
        let target = ApprovalTarget {
            owner,
            spender,
            token: config.contracts.token,
            estimated_gas: config.gas_limit,
        };

        let receipt = execute_plan(
            &plan,
            target,
            &ledger,
            &self.router(&state),
            self.chain.as_ref(),
            &mut trace,
        )
        .await
        .map_err(|failures| PurchaseError::Allowance(failures.join("; ")))?;

        receipt.ok_or_else(|| PurchaseError::InvalidIntent("nothing to approve".to_string()))
    }

    pub async fn approve_spend_permission(
        &self,
        permission: &SpendPermission,
    ) -> Result<B256, ChainError> {
        let state = self.snapshot();
        let call = self.ledger(&state.config).prepare_spend_permission(permission);
        let outcome = self.router(&state).try_send(call, state.config.gas_limit).await?;
        Ok(outcome.tx_hash)
    }

    pub async fn revoke_spend_permission(
        &self,
        permission: &SpendPermission,
    ) -> Result<B256, ChainError> {
        let state = self.snapshot();
        let call = self.ledger(&state.config).prepare_revoke(permission);
        let outcome = self.router(&state).try_send(call, state.config.gas_limit).await?;
        Ok(outcome.tx_hash)
    }

    /// Spend-permission allowance, zero when unsupported or unreadable.
    pub async fn spend_permission_allowance(
        &self,
        account: Address,
        spender: Address,
        token: Address,
    ) -> U256 {
        self.ledger(&self.config())
            .spend_permission_allowance(account, spender, token)
            .await
    }

    // --- reads ---

    pub fn reader(&self) -> JackpotReader {
        JackpotReader::new(self.chain.clone(), self.config())
    }

    pub async fn jackpot_overview(&self) -> Result<JackpotOverview, ReadError> {
        self.reader().overview().await
    }

    pub async fn pool_info(&self, pool_id: U256) -> Option<PoolInfo> {
        self.reader().pool_info(pool_id).await
    }

    /// Tickets the signing account holds in the pool.
    pub async fn user_tickets(&self, pool_id: U256) -> U256 {
        match self.chain.account() {
            Some(holder) => self.reader().user_tickets(pool_id, holder).await,
            None => U256::ZERO,
        }
    }

    /// Round standing of `user`, or of the signing account.
    pub async fn user_info(&self, user: Option<Address>) -> Result<Option<UserInfo>, ReadError> {
        match user.or_else(|| self.chain.account()) {
            Some(user) => self.reader().user_info(user).await.map(Some),
            None => Ok(None),
        }
    }

    /// Whole tickets the signing account bought this round, zero without one.
    pub async fn tickets_this_round(&self) -> Result<U256, ReadError> {
        match self.chain.account() {
            Some(user) => self.reader().tickets_this_round(user).await,
            None => Ok(U256::ZERO),
        }
    }

    /// Most recent settled round within the lookback range.
    pub async fn latest_settlement(&self) -> Result<Option<SettlementEvent>, ScanError> {
        let config = self.config();
        HistoricalEventScanner::new(self.chain.clone(), config.contracts.jackpot, config.scan)
            .find_latest()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{SimulatedChain, SimulatedUser};
    use crate::config::SponsorshipConfig;
    use crate::sponsorship::{SponsorError, SponsorRequest};

    const USER: Address = Address::repeat_byte(0x11);

    struct Accepting;

    #[async_trait::async_trait]
    impl SponsorTransport for Accepting {
        async fn sponsor(
            &self,
            _endpoint: &str,
            _request: &SponsorRequest,
        ) -> Result<serde_json::Value, SponsorError> {
            Ok(serde_json::json!({ "paymasterAndData": "0x01" }))
        }
    }

    fn sdk(chain: &Arc<SimulatedChain>) -> JackpotSdk {
        let config = JackpotConfig {
            retry_delay_ms: 0,
            ..Default::default()
        };
        JackpotSdk::new(config, WalletSource::Custom(chain.clone())).unwrap()
    }

    #[tokio::test]
    async fn test_update_config_swaps_snapshot() {
        let chain = Arc::new(SimulatedChain::new(USER));
        let sdk = sdk(&chain);
        let before = sdk.config();

        sdk.update_config(&ConfigUpdate {
            gas_limit: Some(99_000),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(before.gas_limit, 150_000);
        assert_eq!(sdk.config().gas_limit, 99_000);
        assert_eq!(sdk.config().contracts, before.contracts);
    }

    #[tokio::test]
    async fn test_update_reaches_receipts_and_chain_is_kept() {
        let chain = Arc::new(SimulatedChain::new(USER));
        let sdk = sdk(&chain);

        sdk.update_config(&ConfigUpdate {
            explorer_tx_url: Some("https://sepolia.basescan.org/tx/".to_string()),
            ..Default::default()
        })
        .unwrap();

        let result = sdk.buy_solo_tickets(1).await.unwrap();
        assert!(result.receipt_url.starts_with("https://sepolia.basescan.org/tx/0x"));
        assert_eq!(sdk.account(), Some(USER));
        assert_eq!(chain.sent_labels(), vec!["approve", "buySoloTickets"]);
    }

    #[tokio::test]
    async fn test_sponsorship_enabled_by_update() {
        let chain = Arc::new(SimulatedChain::new(USER));
        let sdk = sdk(&chain).with_sponsor_transport(Arc::new(Accepting));

        let result = sdk.buy_solo_tickets(1).await.unwrap();
        assert!(!result.sponsor_accepted);

        let mut sponsorship = SponsorshipConfig::new("https://sponsor.example");
        sponsorship.max_gas_units = 200_000;
        sdk.update_config(&ConfigUpdate {
            sponsorship: Some(sponsorship),
            ..Default::default()
        })
        .unwrap();

        let result = sdk.buy_solo_tickets(1).await.unwrap();
        assert!(result.sponsor_accepted);
        assert!(!result.sponsored);
    }

    #[tokio::test]
    async fn test_round_reads_use_signing_account() {
        let chain = Arc::new(SimulatedChain::new(USER));
        chain.set_jackpot_state(
            U256::ZERO,
            U256::ZERO,
            U256::ZERO,
            U256::from(86_400u64),
            U256::from(2_500u64),
        );
        chain.set_user_info(
            USER,
            SimulatedUser {
                tickets_purchased_total_bps: U256::from(15_000u64),
                winnings_claimable: U256::ZERO,
                active: true,
            },
        );
        let sdk = sdk(&chain);

        assert_eq!(sdk.tickets_this_round().await.unwrap(), U256::from(2u64));
        assert!(sdk.user_info(None).await.unwrap().unwrap().active);
        let other = sdk.user_info(Some(Address::repeat_byte(0x22))).await.unwrap();
        assert!(!other.unwrap().active);

        let read_only = JackpotSdk::new(
            JackpotConfig::default(),
            WalletSource::Custom(Arc::new(SimulatedChain::read_only())),
        )
        .unwrap();
        assert_eq!(read_only.tickets_this_round().await.unwrap(), U256::ZERO);
        assert!(read_only.user_info(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_approve_token_smart_wallet_falls_back() {
        let chain = Arc::new(SimulatedChain::new(USER));
        chain.make_smart_wallet(USER);
        chain.set_spend_permission_supported(false);
        let sdk = sdk(&chain);

        let receipt = sdk.approve_token(None, U256::from(5_000_000u64)).await.unwrap();
        assert!(matches!(receipt.action, AllowanceAction::ApproveLegacy { .. }));
        assert!(!receipt.sponsored && !receipt.sponsor_accepted);

        let jackpot = sdk.config().contracts.jackpot;
        assert_eq!(chain.allowance(USER, jackpot), U256::from(5_000_000u64));
    }

    #[tokio::test]
    async fn test_spend_permission_roundtrip() {
        let chain = Arc::new(SimulatedChain::new(USER));
        let sdk = sdk(&chain);
        let config = sdk.config();
        let permission = SpendPermission {
            account: USER,
            spender: config.contracts.jackpot,
            token: config.contracts.token,
            allowance: U256::from(7u64),
            period_days: 30,
        };

        sdk.approve_spend_permission(&permission).await.unwrap();
        assert_eq!(
            sdk.spend_permission_allowance(USER, permission.spender, permission.token)
                .await,
            U256::from(7u64)
        );

        let records = sdk.user_allowances(USER, None).await.unwrap();
        assert_eq!(records.len(), 1);

        sdk.revoke_spend_permission(&permission).await.unwrap();
        assert_eq!(
            sdk.spend_permission_allowance(USER, permission.spender, permission.token)
                .await,
            U256::ZERO
        );
    }

    #[tokio::test]
    async fn test_user_tickets_read_only() {
        let chain = Arc::new(SimulatedChain::read_only());
        let sdk = sdk(&chain);
        assert_eq!(sdk.user_tickets(U256::from(1u64)).await, U256::ZERO);
        assert!(sdk.buy_solo_tickets(1).await.is_err());
    }
}
