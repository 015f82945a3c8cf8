//! Round history: backward windowed scan for the latest settlement event.

pub mod event;
pub mod history;

pub use event::SettlementEvent;
pub use history::{HistoricalEventScanner, ScanWindows, MAX_LOOKBACK_BLOCKS, WINDOW_BLOCKS};
