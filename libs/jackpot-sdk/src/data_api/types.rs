use serde::{Deserialize, Serialize};

/// Envelope returned by every data API endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }
    }

    /// Failure carrying `data`, e.g. an empty list.
    pub fn failure_with(error: impl Into<String>, data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::failure(error)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    Open,
    Closed,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPool {
    pub id: String,
    pub participants: u64,
    pub max_participants: u64,
    /// Display price as reported by the API, not used for payment math
    pub ticket_price: serde_json::Number,
    pub status: PoolStatus,
    pub end_time: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    pub total_pools: u64,
    pub active_pools: u64,
    pub total_participants: u64,
    pub total_volume: serde_json::Number,
    pub average_pool_size: serde_json::Number,
}
