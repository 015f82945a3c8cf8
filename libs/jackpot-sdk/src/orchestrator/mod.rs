//! Ticket purchase orchestration

pub mod approval;
pub mod purchase;
pub mod state;

pub use approval::{execute_plan, ApprovalPlan, ApprovalReceipt, ApprovalTarget};
pub use purchase::TransactionOrchestrator;
pub use state::{PurchaseState, PurchaseTrace};
