use std::sync::Arc;

use alloy::rpc::types::Log;
use alloy_primitives::{Address, LogData, U256};
use alloy_sol_types::SolEvent;
use common::interfaces::jackpot::IJackpot;
use jackpot_sdk::chain::SimulatedChain;
use jackpot_sdk::config::ScanSettings;
use jackpot_sdk::scanner::{HistoricalEventScanner, MAX_LOOKBACK_BLOCKS, WINDOW_BLOCKS};
use jackpot_sdk::ScanError;

fn jackpot() -> Address {
    jackpot_sdk::JackpotConfig::default().contracts.jackpot
}

fn run(winner: u8, amount: u64) -> IJackpot::JackpotRun {
    IJackpot::JackpotRun {
        time: U256::from(1_700_000_000u64),
        winner: Address::repeat_byte(winner),
        winningTicket: U256::from(42u64),
        winAmount: U256::from(amount),
        ticketsPurchasedTotalBps: U256::from(10_000u64),
    }
}

fn scanner(chain: &Arc<SimulatedChain>) -> HistoricalEventScanner {
    HistoricalEventScanner::new(chain.clone(), jackpot(), ScanSettings::default())
}

#[tokio::test]
async fn test_finds_event_in_first_window() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(100_000);
    chain.push_settlement(jackpot(), run(0xaa, 500), 97_500, 0);

    let event = scanner(&chain).find_latest().await.unwrap().unwrap();

    assert_eq!(event.block_number, 97_500);
    assert_eq!(event.winner, Address::repeat_byte(0xaa));
    assert_eq!(event.win_amount, U256::from(500u64));

    let queries = chain.log_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].from_block, 95_001);
    assert_eq!(queries[0].to_block, 100_000);
    assert_eq!(queries[0].event_signature, IJackpot::JackpotRun::SIGNATURE_HASH);
}

#[tokio::test]
async fn test_latest_is_greatest_block_then_log_index() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(100_000);
    // provider order deliberately scrambled
    chain.push_settlement(jackpot(), run(0x01, 1), 99_000, 7);
    chain.push_settlement(jackpot(), run(0x02, 2), 99_500, 1);
    chain.push_settlement(jackpot(), run(0x03, 3), 96_000, 9);
    chain.push_settlement(jackpot(), run(0x04, 4), 99_500, 4);

    let event = scanner(&chain).find_latest().await.unwrap().unwrap();

    assert_eq!(event.position(), (99_500, 4));
    assert_eq!(event.winner, Address::repeat_byte(0x04));
}

#[tokio::test]
async fn test_older_window_found_after_empty_windows() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(100_000);
    chain.push_settlement(jackpot(), run(0x05, 5), 80_000, 0);

    let event = scanner(&chain).find_latest().await.unwrap().unwrap();

    assert_eq!(event.block_number, 80_000);
    assert_eq!(chain.log_queries().len(), 5);
}

#[tokio::test]
async fn test_nothing_found_stays_within_lookback() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(100_000);
    // outside the lookback range
    chain.push_settlement(jackpot(), run(0x06, 6), 50_000, 0);

    let result = scanner(&chain).find_latest().await.unwrap();
    assert!(result.is_none());

    let queries = chain.log_queries();
    assert_eq!(queries.len(), 9);
    let covered: u64 = queries.iter().map(|q| q.to_block - q.from_block + 1).sum();
    assert!(covered <= MAX_LOOKBACK_BLOCKS + WINDOW_BLOCKS);
    assert_eq!(queries.last().unwrap().from_block, 55_001);
}

#[tokio::test]
async fn test_short_chain_stops_at_genesis() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(1_200);

    assert!(scanner(&chain).find_latest().await.unwrap().is_none());

    let queries = chain.log_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!((queries[0].from_block, queries[0].to_block), (0, 1_200));
}

#[tokio::test]
async fn test_events_from_other_contracts_are_ignored() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(10_000);
    chain.push_settlement(Address::repeat_byte(0x99), run(0x07, 7), 9_000, 0);

    assert!(scanner(&chain).find_latest().await.unwrap().is_none());
}

#[tokio::test]
async fn test_window_failure_aborts_without_partial_result() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(100_000);
    chain.push_settlement(jackpot(), run(0x08, 8), 80_000, 0);
    chain.fail_log_query(1);

    let err = scanner(&chain).find_latest().await.unwrap_err();

    assert!(matches!(
        err,
        ScanError::Window {
            from_block: 90_001,
            to_block: 95_000,
            ..
        }
    ));
    assert_eq!(chain.log_queries().len(), 2);
}

#[tokio::test]
async fn test_block_number_failure() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.fail_block_number();

    let err = scanner(&chain).find_latest().await.unwrap_err();
    assert!(matches!(err, ScanError::BlockNumber(_)));
    assert!(chain.log_queries().is_empty());
}

#[tokio::test]
async fn test_undecodable_log_is_scan_error() {
    let chain = Arc::new(SimulatedChain::read_only());
    chain.set_block_number(100_000);
    chain.push_log(Log {
        inner: alloy_primitives::Log {
            address: jackpot(),
            data: LogData::new_unchecked(
                vec![IJackpot::JackpotRun::SIGNATURE_HASH],
                vec![0u8; 7].into(),
            ),
        },
        block_number: Some(99_999),
        log_index: Some(0),
        ..Default::default()
    });

    let err = scanner(&chain).find_latest().await.unwrap_err();
    assert!(matches!(err, ScanError::Decode { block_number: Some(99_999), .. }));
}
