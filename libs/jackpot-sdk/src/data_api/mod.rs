//! REST data API (pool listings and statistics)

pub mod client;
pub mod types;

pub use client::DataApiClient;
pub use types::{ApiPool, ApiResponse, PoolStats, PoolStatus};
