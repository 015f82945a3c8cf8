use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use common::interfaces::jackpot::IJackpot;
use serde::{Deserialize, Serialize};

use crate::errors::ScanError;

/// Decoded `JackpotRun` log: the outcome of one settled round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementEvent {
    /// Settlement time, unix seconds
    pub timestamp: U256,
    pub winner: Address,
    pub winning_ticket: U256,
    pub win_amount: U256,
    pub total_tickets_bps: U256,
    pub block_number: u64,
    pub log_index: u64,
    pub tx_hash: Option<B256>,
}

impl SettlementEvent {
    pub fn from_log(log: &Log) -> Result<Self, ScanError> {
        let decoded = IJackpot::JackpotRun::decode_log(&log.inner).map_err(|e| ScanError::Decode {
            block_number: log.block_number,
            reason: e.to_string(),
        })?;

        Ok(Self {
            timestamp: decoded.data.time,
            winner: decoded.data.winner,
            winning_ticket: decoded.data.winningTicket,
            win_amount: decoded.data.winAmount,
            total_tickets_bps: decoded.data.ticketsPurchasedTotalBps,
            block_number: log.block_number.unwrap_or(0),
            log_index: log.log_index.unwrap_or(0),
            tx_hash: log.transaction_hash,
        })
    }

    /// Ordering key: later block first, then later position in the block.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    /// Settlement time as a UTC timestamp, if it fits.
    pub fn settled_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let secs = i64::try_from(self.timestamp).ok()?;
        chrono::DateTime::from_timestamp(secs, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{b256, LogData};

    fn run_event() -> IJackpot::JackpotRun {
        IJackpot::JackpotRun {
            time: U256::from(1_700_000_000u64),
            winner: Address::repeat_byte(0x42),
            winningTicket: U256::from(17u64),
            winAmount: U256::from(250_000_000u64),
            ticketsPurchasedTotalBps: U256::from(12_000u64),
        }
    }

    #[test]
    fn test_signature_hash() {
        assert_eq!(
            IJackpot::JackpotRun::SIGNATURE_HASH,
            b256!("3208da215cdfa0c44cf3d81565b27f57d4c505bf1a48e40957e53aaf3ba2aa82")
        );
    }

    #[test]
    fn test_from_log() {
        let log = Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(9),
                data: run_event().encode_log_data(),
            },
            block_number: Some(97_500),
            log_index: Some(3),
            ..Default::default()
        };

        let event = SettlementEvent::from_log(&log).unwrap();
        assert_eq!(event.winner, Address::repeat_byte(0x42));
        assert_eq!(event.winning_ticket, U256::from(17u64));
        assert_eq!(event.position(), (97_500, 3));
        assert_eq!(
            event.settled_at().unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_from_log_rejects_garbage() {
        let log = Log {
            inner: alloy_primitives::Log {
                address: Address::repeat_byte(9),
                data: LogData::new_unchecked(
                    vec![IJackpot::JackpotRun::SIGNATURE_HASH],
                    vec![1, 2, 3].into(),
                ),
            },
            block_number: Some(10),
            ..Default::default()
        };

        assert!(matches!(
            SettlementEvent::from_log(&log),
            Err(ScanError::Decode { block_number: Some(10), .. })
        ));
    }
}
