use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::errors::PurchaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    Solo,
    Pool,
}

impl core::fmt::Display for PurchaseKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PurchaseKind::Solo => write!(f, "solo"),
            PurchaseKind::Pool => write!(f, "pool"),
        }
    }
}

/// Request to buy tickets. Construct with [`PurchaseIntent::solo`] or
/// [`PurchaseIntent::pool`]; the fields are public so malformed intents
/// coming from outside (CLI, JSON) are still caught by [`PurchaseIntent::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    pub kind: PurchaseKind,
    pub ticket_count: u64,
    pub pool_id: Option<U256>,
    /// Paying account. Defaults to the accessor's account when unset.
    pub payer: Option<Address>,
}

impl PurchaseIntent {
    pub fn solo(ticket_count: u64) -> Self {
        Self {
            kind: PurchaseKind::Solo,
            ticket_count,
            pool_id: None,
            payer: None,
        }
    }

    pub fn pool(pool_id: U256, ticket_count: u64) -> Self {
        Self {
            kind: PurchaseKind::Pool,
            ticket_count,
            pool_id: Some(pool_id),
            payer: None,
        }
    }

    pub fn with_payer(mut self, payer: Address) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn validate(&self) -> Result<(), PurchaseError> {
        if self.ticket_count < 1 {
            return Err(PurchaseError::InvalidIntent(
                "ticket count must be at least 1".to_string(),
            ));
        }
        match (self.kind, self.pool_id) {
            (PurchaseKind::Pool, None) => Err(PurchaseError::InvalidIntent(
                "pool purchase requires a pool id".to_string(),
            )),
            (PurchaseKind::Solo, Some(_)) => Err(PurchaseError::InvalidIntent(
                "solo purchase must not carry a pool id".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Outcome of a confirmed purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub tx_hash: B256,
    pub kind: PurchaseKind,
    pub ticket_count: u64,
    /// Total cost in the token's smallest unit
    pub cost_in_smallest_unit: U256,
    pub pool_id: Option<U256>,
    /// Gas was paid by the sponsor. Purchases are always submitted from
    /// the caller's account, so this stays false.
    pub sponsored: bool,
    /// The sponsor accepted the purchase call before the normal send.
    pub sponsor_accepted: bool,
    pub receipt_url: String,
}

/// Receipt link for a transaction hash, e.g. `https://basescan.org/tx/0x…`.
pub fn receipt_url(explorer_tx_url: &str, tx_hash: &B256) -> String {
    format!("{}{:?}", explorer_tx_url, tx_hash)
}
