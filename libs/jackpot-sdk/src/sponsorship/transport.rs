use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SPONSOR_METHOD: &str = "pm_sponsorUserOperation";

/// Reasons a sponsor request did not produce a sponsorship. Never leaves the
/// sponsorship module as an error; the router downgrades it to a normal send.
#[derive(Debug, Clone, Error)]
pub enum SponsorError {
    #[error("sponsor request timed out")]
    Timeout,

    #[error("sponsor transport error: {0}")]
    Transport(String),

    #[error("sponsor returned HTTP {0}")]
    Status(u16),

    #[error("malformed sponsor response: {0}")]
    Malformed(String),

    #[error("sponsor rejected the operation: {0}")]
    Rejected(String),
}

/// User operation submitted for sponsorship
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: String,
    pub init_code: String,
    pub call_data: Bytes,
    pub call_gas_limit: String,
    pub verification_gas_limit: String,
    pub pre_verification_gas: String,
    pub max_fee_per_gas: String,
    pub max_priority_fee_per_gas: String,
    pub paymaster_and_data: String,
    pub signature: String,
}

impl UserOperation {
    pub fn new(sender: Address, call_data: Bytes, call_gas_limit: u64) -> Self {
        Self {
            sender,
            nonce: "0x0".to_string(),
            init_code: "0x".to_string(),
            call_data,
            call_gas_limit: format!("{:#x}", call_gas_limit),
            // 21000
            verification_gas_limit: "0x5208".to_string(),
            pre_verification_gas: "0x5208".to_string(),
            max_fee_per_gas: "0x0".to_string(),
            max_priority_fee_per_gas: "0x0".to_string(),
            paymaster_and_data: "0x".to_string(),
            signature: "0x".to_string(),
        }
    }
}

/// JSON-RPC envelope posted to the sponsor endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SponsorRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: Vec<UserOperation>,
}

impl SponsorRequest {
    pub fn new(operation: UserOperation) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method: SPONSOR_METHOD,
            params: vec![operation],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SponsorRpcError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SponsorResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<SponsorRpcError>,
}

/// Sponsor endpoint seam, so tests can observe and script sponsor traffic.
#[async_trait::async_trait]
pub trait SponsorTransport: Send + Sync {
    /// Post `request` to `endpoint` and return the sponsor's `result`.
    async fn sponsor(
        &self,
        endpoint: &str,
        request: &SponsorRequest,
    ) -> Result<serde_json::Value, SponsorError>;
}

/// Sponsor transport over HTTP
#[derive(Clone)]
pub struct HttpSponsor {
    client: Client,
}

impl HttpSponsor {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl SponsorTransport for HttpSponsor {
    async fn sponsor(
        &self,
        endpoint: &str,
        request: &SponsorRequest,
    ) -> Result<serde_json::Value, SponsorError> {
        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SponsorError::Timeout
                } else {
                    SponsorError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(SponsorError::Status(response.status().as_u16()));
        }

        let body: SponsorResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SponsorError::Timeout
            } else {
                SponsorError::Malformed(e.to_string())
            }
        })?;

        parse_response(body)
    }
}

fn parse_response(body: SponsorResponse) -> Result<serde_json::Value, SponsorError> {
    if let Some(error) = body.error {
        return Err(SponsorError::Rejected(match error.code {
            Some(code) => format!("{} (code {})", error.message, code),
            None => error.message,
        }));
    }

    body.result
        .ok_or_else(|| SponsorError::Malformed("neither result nor error present".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let operation = UserOperation::new(
            Address::repeat_byte(1),
            Bytes::from_static(&[0xde, 0xad]),
            150_000,
        );
        let json = serde_json::to_value(SponsorRequest::new(operation)).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "pm_sponsorUserOperation");
        let op = &json["params"][0];
        assert_eq!(op["callData"], "0xdead");
        assert_eq!(op["callGasLimit"], "0x249f0");
        assert_eq!(op["verificationGasLimit"], "0x5208");
        assert_eq!(op["paymasterAndData"], "0x");
        assert_eq!(
            op["sender"],
            "0x0101010101010101010101010101010101010101"
        );
    }

    #[test]
    fn test_parse_response_error() {
        let body: SponsorResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"no funds"}}"#)
                .unwrap();
        let err = parse_response(body).unwrap_err();
        assert!(matches!(err, SponsorError::Rejected(ref m) if m.contains("no funds")));
    }

    #[test]
    fn test_parse_response_result() {
        let body: SponsorResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":{"paymasterAndData":"0x01"}}"#)
                .unwrap();
        let result = parse_response(body).unwrap();
        assert_eq!(result["paymasterAndData"], "0x01");
    }

    #[test]
    fn test_parse_response_empty() {
        let body: SponsorResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(matches!(parse_response(body), Err(SponsorError::Malformed(_))));
    }
}
