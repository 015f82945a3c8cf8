//! Jackpot, pool and token state reads

pub mod reader;

pub use reader::{JackpotOverview, JackpotReader, PoolInfo, UserInfo, BPS_DENOMINATOR};
