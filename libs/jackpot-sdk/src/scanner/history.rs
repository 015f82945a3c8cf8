use std::sync::Arc;

use alloy_primitives::Address;
use alloy_sol_types::SolEvent;
use common::interfaces::jackpot::IJackpot;

use super::event::SettlementEvent;
use crate::chain::{ChainAccessor, LogQuery};
use crate::config::ScanSettings;
use crate::errors::ScanError;

/// Furthest the scan reaches back, in blocks (about a day on Base).
pub const MAX_LOOKBACK_BLOCKS: u64 = 43_200;

/// Blocks per log query
pub const WINDOW_BLOCKS: u64 = 5_000;

/// Inclusive block ranges walked backward from a head block.
///
/// Windows are contiguous and non-overlapping. A new window is started as
/// long as the blocks already covered do not exceed `max_lookback`, and the
/// walk stops at genesis.
#[derive(Debug, Clone)]
pub struct ScanWindows {
    next_to: Option<u64>,
    scanned: u64,
    max_lookback: u64,
    window: u64,
}

impl ScanWindows {
    pub fn new(head: u64, settings: ScanSettings) -> Self {
        Self {
            next_to: Some(head),
            scanned: 0,
            max_lookback: settings.max_lookback_blocks,
            window: settings.window_blocks.max(1),
        }
    }
}

impl Iterator for ScanWindows {
    /// `(from_block, to_block)`
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let to_block = self.next_to?;
        if self.scanned > self.max_lookback {
            self.next_to = None;
            return None;
        }

        let size = self.window.min(to_block.saturating_add(1));
        let from_block = to_block + 1 - size;

        self.scanned += size;
        self.next_to = from_block.checked_sub(1);

        Some((from_block, to_block))
    }
}

/// Finds the most recent `JackpotRun` event by walking log history backward
/// from the chain head.
pub struct HistoricalEventScanner {
    chain: Arc<dyn ChainAccessor>,
    jackpot: Address,
    settings: ScanSettings,
}

impl HistoricalEventScanner {
    pub fn new(chain: Arc<dyn ChainAccessor>, jackpot: Address, settings: ScanSettings) -> Self {
        Self {
            chain,
            jackpot,
            settings,
        }
    }

    /// Latest settlement within the lookback range, `None` if there is none.
    /// Any failed window aborts the scan.
    pub async fn find_latest(&self) -> Result<Option<SettlementEvent>, ScanError> {
        let head = self
            .chain
            .block_number()
            .await
            .map_err(ScanError::BlockNumber)?;

        tracing::debug!(head, jackpot = %self.jackpot, "Scanning for latest settlement");

        for (from_block, to_block) in ScanWindows::new(head, self.settings) {
            let query = LogQuery {
                address: self.jackpot,
                event_signature: IJackpot::JackpotRun::SIGNATURE_HASH,
                from_block,
                to_block,
            };

            let logs = self
                .chain
                .logs(query)
                .await
                .map_err(|source| ScanError::Window {
                    from_block,
                    to_block,
                    source,
                })?;

            tracing::debug!(window_from = from_block, window_to = to_block, logs = logs.len(), "Scanned window");

            if logs.is_empty() {
                continue;
            }

            let mut events = logs
                .iter()
                .map(SettlementEvent::from_log)
                .collect::<Result<Vec<_>, _>>()?;
            events.sort_by(|a, b| b.position().cmp(&a.position()));

            let latest = events.into_iter().next();
            if let Some(event) = &latest {
                tracing::info!(
                    block = event.block_number,
                    winner = %event.winner,
                    "Found latest settlement"
                );
            }
            return Ok(latest);
        }

        tracing::info!(head, "No settlement within lookback range");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(head: u64, max_lookback: u64, window: u64) -> Vec<(u64, u64)> {
        ScanWindows::new(
            head,
            ScanSettings {
                max_lookback_blocks: max_lookback,
                window_blocks: window,
            },
        )
        .collect()
    }

    #[test]
    fn test_default_windows_from_100k() {
        let all = windows(100_000, MAX_LOOKBACK_BLOCKS, WINDOW_BLOCKS);
        assert_eq!(all.len(), 9);
        assert_eq!(all[0], (95_001, 100_000));
        assert_eq!(all[1], (90_001, 95_000));
        assert_eq!(all[8], (55_001, 60_000));
    }

    #[test]
    fn test_windows_are_contiguous() {
        let all = windows(100_000, MAX_LOOKBACK_BLOCKS, WINDOW_BLOCKS);
        for pair in all.windows(2) {
            assert_eq!(pair[1].1 + 1, pair[0].0);
        }
    }

    #[test]
    fn test_windows_stop_at_genesis() {
        let all = windows(7_000, MAX_LOOKBACK_BLOCKS, WINDOW_BLOCKS);
        assert_eq!(all, vec![(2_001, 7_000), (0, 2_000)]);

        assert_eq!(windows(0, MAX_LOOKBACK_BLOCKS, WINDOW_BLOCKS), vec![(0, 0)]);
    }

    #[test]
    fn test_zero_window_is_clamped() {
        let all = windows(3, 10, 0);
        assert_eq!(all, vec![(3, 3), (2, 2), (1, 1), (0, 0)]);
    }
}
