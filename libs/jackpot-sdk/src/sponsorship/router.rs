use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::B256;

use super::transport::{SponsorError, SponsorRequest, SponsorTransport, UserOperation};
use crate::chain::{ChainAccessor, PreparedCall};
use crate::config::SponsorshipConfig;
use crate::errors::ChainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    Disabled,
    OverGasCeiling { estimated: u64, ceiling: u64 },
}

/// What happened on the sponsorship side of a send
#[derive(Debug, Clone, PartialEq)]
pub enum SponsorshipOutcome {
    /// No sponsor request was made.
    Skipped(SkipReason),
    /// The sponsor request failed; the call went out normally.
    Unavailable(String),
    /// The sponsor accepted the operation and returned `reference`.
    Accepted { reference: serde_json::Value },
}

impl SponsorshipOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SponsorshipOutcome::Accepted { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    pub tx_hash: B256,
    pub sponsorship: SponsorshipOutcome,
    /// Gas was paid by the sponsor. Always false while the transaction is
    /// submitted from the accessor's account, even after an acceptance.
    pub sponsored: bool,
}

/// Routes prepared calls through the gas sponsor when they qualify, then
/// submits them. Every `try_send` performs exactly one chain submission
/// whatever the sponsor says.
pub struct SponsorshipRouter {
    chain: Arc<dyn ChainAccessor>,
    config: Option<SponsorshipConfig>,
    transport: Arc<dyn SponsorTransport>,
}

impl SponsorshipRouter {
    pub fn new(
        chain: Arc<dyn ChainAccessor>,
        config: Option<SponsorshipConfig>,
        transport: Arc<dyn SponsorTransport>,
    ) -> Self {
        Self {
            chain,
            config,
            transport,
        }
    }

    /// Sponsor endpoint for a call of `estimated_gas`, or why there is none.
    fn eligible(&self, estimated_gas: u64) -> Result<(&str, Duration), SkipReason> {
        let config = self.config.as_ref().ok_or(SkipReason::NotConfigured)?;
        if !config.enabled {
            return Err(SkipReason::Disabled);
        }
        let endpoint = config
            .active_endpoint()
            .ok_or(SkipReason::NotConfigured)?;
        if estimated_gas > config.max_gas_units {
            return Err(SkipReason::OverGasCeiling {
                estimated: estimated_gas,
                ceiling: config.max_gas_units,
            });
        }
        Ok((endpoint, Duration::from_millis(config.timeout_ms)))
    }

    async fn request_sponsorship(
        &self,
        endpoint: &str,
        timeout: Duration,
        request: &SponsorRequest,
    ) -> Result<serde_json::Value, SponsorError> {
        match tokio::time::timeout(timeout, self.transport.sponsor(endpoint, request)).await {
            Ok(result) => result,
            Err(_) => Err(SponsorError::Timeout),
        }
    }

    pub async fn try_send(
        &self,
        call: PreparedCall,
        estimated_gas: u64,
    ) -> Result<SendOutcome, ChainError> {
        let sender = self.chain.account().ok_or(ChainError::NoSigner)?;

        let sponsorship = match self.eligible(estimated_gas) {
            Err(reason) => {
                if let SkipReason::OverGasCeiling { estimated, ceiling } = reason {
                    tracing::debug!(
                        label = call.label,
                        estimated,
                        ceiling,
                        "Gas above sponsorship ceiling, sending normally"
                    );
                }
                SponsorshipOutcome::Skipped(reason)
            }
            Ok((endpoint, timeout)) => {
                let request = SponsorRequest::new(UserOperation::new(
                    sender,
                    call.input.clone(),
                    estimated_gas,
                ));

                match self.request_sponsorship(endpoint, timeout, &request).await {
                    Ok(reference) => {
                        tracing::info!(label = call.label, "Sponsor accepted operation");
                        SponsorshipOutcome::Accepted { reference }
                    }
                    Err(e) => {
                        tracing::warn!(label = call.label, "Sponsorship failed, sending normally: {}", e);
                        SponsorshipOutcome::Unavailable(e.to_string())
                    }
                }
            }
        };

        let label = call.label;
        let tx_hash = self.chain.send(call).await?;
        tracing::info!(
            label,
            tx_hash = ?tx_hash,
            sponsor_accepted = sponsorship.is_accepted(),
            "Transaction submitted"
        );

        Ok(SendOutcome {
            tx_hash,
            sponsorship,
            sponsored: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::SimulatedChain;
    use alloy_primitives::{Address, U256};
    use alloy_sol_types::SolCall;
    use common::interfaces::erc20::IERC20;
    use parking_lot::Mutex;

    struct Scripted {
        reply: Result<serde_json::Value, SponsorError>,
        calls: Mutex<Vec<SponsorRequest>>,
    }

    #[async_trait::async_trait]
    impl SponsorTransport for Scripted {
        async fn sponsor(
            &self,
            _endpoint: &str,
            request: &SponsorRequest,
        ) -> Result<serde_json::Value, SponsorError> {
            self.calls.lock().push(request.clone());
            self.reply.clone()
        }
    }

    fn approve_call() -> PreparedCall {
        let call = IERC20::approveCall {
            spender: Address::repeat_byte(2),
            value: U256::from(1u64),
        };
        PreparedCall::new(Address::repeat_byte(3), &call, 40_000, "approve")
    }

    fn router(
        config: Option<SponsorshipConfig>,
        reply: Result<serde_json::Value, SponsorError>,
    ) -> (SponsorshipRouter, Arc<Scripted>, Arc<SimulatedChain>) {
        let chain = Arc::new(SimulatedChain::new(Address::repeat_byte(1)));
        let transport = Arc::new(Scripted {
            reply,
            calls: Mutex::new(Vec::new()),
        });
        (
            SponsorshipRouter::new(chain.clone(), config, transport.clone()),
            transport,
            chain,
        )
    }

    #[tokio::test]
    async fn test_not_configured_skips() {
        let (router, transport, chain) = router(None, Ok(serde_json::json!({})));
        let outcome = router.try_send(approve_call(), 40_000).await.unwrap();

        assert_eq!(
            outcome.sponsorship,
            SponsorshipOutcome::Skipped(SkipReason::NotConfigured)
        );
        assert!(transport.calls.lock().is_empty());
        assert_eq!(chain.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_skips() {
        let mut config = SponsorshipConfig::new("https://sponsor.example");
        config.enabled = false;
        let (router, transport, _) = router(Some(config), Ok(serde_json::json!({})));

        let outcome = router.try_send(approve_call(), 40_000).await.unwrap();
        assert_eq!(outcome.sponsorship, SponsorshipOutcome::Skipped(SkipReason::Disabled));
        assert!(transport.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_accepted_still_sends_once() {
        let config = SponsorshipConfig::new("https://sponsor.example");
        let (router, transport, chain) =
            router(Some(config), Ok(serde_json::json!({ "paymasterAndData": "0x01" })));

        let outcome = router.try_send(approve_call(), 40_000).await.unwrap();
        assert!(outcome.sponsorship.is_accepted());
        // the account still paid for the send
        assert!(!outcome.sponsored);
        assert_eq!(transport.calls.lock().len(), 1);
        assert_eq!(chain.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_falls_back() {
        let config = SponsorshipConfig::new("https://sponsor.example");
        let (router, _, chain) = router(
            Some(config),
            Err(SponsorError::Rejected("no funds".to_string())),
        );

        let outcome = router.try_send(approve_call(), 40_000).await.unwrap();
        assert!(matches!(outcome.sponsorship, SponsorshipOutcome::Unavailable(_)));
        assert_eq!(chain.sends().len(), 1);
    }

    #[tokio::test]
    async fn test_submission_failure_propagates() {
        let (router, _, chain) = router(None, Ok(serde_json::json!({})));
        chain.fail_sends(IERC20::approveCall::SELECTOR, 1);

        let err = router.try_send(approve_call(), 40_000).await.unwrap_err();
        assert!(matches!(err, ChainError::Submission(_)));
    }
}
