//! Token authorization: ERC-20 approvals and smart-wallet spend permissions.

pub mod ledger;
pub mod types;

pub use ledger::AllowanceLedger;
pub use types::{AllowanceAction, AuthorizationRecord, AuthorizationScheme, SpendPermission};
