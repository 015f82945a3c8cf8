//! Chain gateway: the accessor trait, its JSON-RPC and simulated
//! implementations, wallet selection and read retries.

pub mod accessor;
pub mod retry;
pub mod rpc;
pub mod simulated;
pub mod wallet;

pub use accessor::{decode_return, ChainAccessor, ContractCall, LogQuery, PreparedCall, TxReceipt};
pub use retry::ReadRetry;
pub use rpc::AlloyChain;
pub use simulated::{SimulatedChain, SimulatedPool, SimulatedUser};
pub use wallet::WalletSource;
