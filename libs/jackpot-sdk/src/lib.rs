//! Jackpot SDK
//!
//! Buys tickets in the on-chain jackpot (solo or pooled), manages the
//! stablecoin authorization the purchases need, routes transactions through
//! an optional gas sponsor and reconstructs the latest settled round from
//! chain logs.
//!
//! [`JackpotSdk`] is the entry point. The pieces it wires together are
//! usable on their own:
//!
//! - [`chain`]: the [`ChainAccessor`](chain::ChainAccessor) gateway, its
//!   JSON-RPC and simulated implementations, wallet selection
//! - [`allowance`]: current versus required authorization
//! - [`sponsorship`]: paymaster routing with fallback to a normal send
//! - [`orchestrator`]: the purchase state machine
//! - [`scanner`]: backward windowed search for the latest settlement
//! - [`jackpot`]: contract state reads
//! - [`data_api`]: REST pool listings

pub mod allowance;
pub mod chain;
pub mod config;
pub mod data_api;
pub mod errors;
pub mod jackpot;
pub mod orchestrator;
pub mod scanner;
pub mod sdk;
pub mod sponsorship;
pub mod types;

pub use config::{ConfigUpdate, JackpotConfig, SponsorshipConfig};
pub use errors::{ChainError, PurchaseError, ReadError, ScanError, SdkError};
pub use sdk::JackpotSdk;
pub use types::{PurchaseIntent, PurchaseKind, PurchaseResult};
