pub mod amount;

pub mod interfaces {
    pub mod erc20;
    pub mod jackpot;
    pub mod jackpot_pool;
    pub mod spend_permission_manager;
}
