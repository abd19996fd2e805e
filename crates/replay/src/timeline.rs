//! Height and time windows between consecutive forged blocks.
//!
//! The forged-block list is walked newest first. The window of a block spans
//! from the block itself up to (excluding) the next newer forged block. The
//! newest block's height range is open-ended; its time range ends at the run
//! time, so stake events that have not happened yet are never undone.

use crate::errors::ReplayError;
use std::collections::HashMap;
use tbw_types::{ChainTimestamp, ForgedBlock, Height};

/// Ledger range attributed to one forged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockWindow {
    pub height: Height,
    pub timestamp: ChainTimestamp,
    /// Height of the next newer forged block
    pub upper_height: Option<Height>,
    /// Timestamp of the next newer forged block, or the run time
    pub upper_timestamp: ChainTimestamp,
}

impl BlockWindow {
    /// `[height, upper_height)`
    pub fn contains_height(&self, height: Height) -> bool {
        height >= self.height && self.upper_height.map_or(true, |upper| height < upper)
    }

    /// `(height, upper_height]`
    pub fn follows_height(&self, height: Height) -> bool {
        height > self.height && self.upper_height.map_or(true, |upper| height <= upper)
    }

    /// `[timestamp, upper_timestamp)`
    pub fn contains_time(&self, timestamp: ChainTimestamp) -> bool {
        timestamp >= self.timestamp && timestamp < self.upper_timestamp
    }
}

/// Validated, newest-first sequence of block windows.
#[derive(Debug, Clone, Default)]
pub struct BlockTimeline {
    windows: Vec<BlockWindow>,
    index: HashMap<Height, usize>,
}

impl BlockTimeline {
    /// Build the timeline from forged blocks ordered by descending height.
    /// `now` is the chain time of the run and closes the newest time window.
    pub fn new(blocks: &[ForgedBlock], now: ChainTimestamp) -> Result<Self, ReplayError> {
        let mut windows = Vec::with_capacity(blocks.len());
        let mut index = HashMap::with_capacity(blocks.len());
        let mut newer: Option<&ForgedBlock> = None;

        for block in blocks {
            if let Some(previous) = newer {
                if block.height >= previous.height {
                    return Err(ReplayError::UnorderedBlocks {
                        previous: previous.height,
                        height: block.height,
                    });
                }
                if block.timestamp > previous.timestamp {
                    return Err(ReplayError::TimestampRegression {
                        newer: previous.height,
                        older: block.height,
                    });
                }
            }

            index.insert(block.height, windows.len());
            windows.push(BlockWindow {
                height: block.height,
                timestamp: block.timestamp,
                upper_height: newer.map(|b| b.height),
                upper_timestamp: newer.map_or(now.max(block.timestamp), |b| b.timestamp),
            });
            newer = Some(block);
        }

        Ok(Self { windows, index })
    }

    /// Windows in walk order, newest block first
    pub fn windows(&self) -> &[BlockWindow] {
        &self.windows
    }

    /// Window of the forged block at `height`
    pub fn window(&self, height: Height) -> Result<&BlockWindow, ReplayError> {
        self.index
            .get(&height)
            .map(|&i| &self.windows[i])
            .ok_or(ReplayError::MissingTimestamp { height })
    }

    pub fn timestamp_of(&self, height: Height) -> Result<ChainTimestamp, ReplayError> {
        self.window(height).map(|w| w.timestamp)
    }

    pub fn newest(&self) -> Option<&BlockWindow> {
        self.windows.first()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn block(height: Height, timestamp: ChainTimestamp) -> ForgedBlock {
        ForgedBlock::new(height, timestamp, Decimal::from(200_000_000u64), Decimal::ZERO)
    }

    #[test]
    fn windows_chain_to_the_newer_block() {
        let timeline = BlockTimeline::new(
            &[block(300, 3000), block(200, 2000), block(100, 1000)],
            4000,
        )
        .unwrap();

        let newest = timeline.window(300).unwrap();
        assert_eq!(newest.upper_height, None);
        assert!(newest.contains_height(10_000));

        let middle = timeline.window(200).unwrap();
        assert!(middle.contains_height(200));
        assert!(middle.contains_height(299));
        assert!(!middle.contains_height(300));
        assert!(middle.follows_height(300));
        assert!(!middle.follows_height(200));
        assert!(middle.contains_time(2999));
        assert!(!middle.contains_time(3000));
    }

    #[test]
    fn now_bounds_the_newest_window() {
        let timeline = BlockTimeline::new(&[block(200, 2000), block(100, 1000)], 2500).unwrap();

        let newest = timeline.window(200).unwrap();
        assert!(newest.contains_time(2499));
        assert!(!newest.contains_time(2500));
        assert!(!newest.contains_time(9000));
        assert_eq!(newest.upper_height, None);
    }

    #[test]
    fn stale_now_closes_the_newest_window_at_its_block() {
        let timeline = BlockTimeline::new(&[block(200, 2000)], 1500).unwrap();

        let newest = timeline.window(200).unwrap();
        assert_eq!(newest.upper_timestamp, 2000);
        assert!(!newest.contains_time(2000));
    }

    #[test]
    fn rejects_unordered_blocks() {
        let err = BlockTimeline::new(&[block(100, 1000), block(200, 2000)], 3000).unwrap_err();
        assert!(matches!(err, ReplayError::UnorderedBlocks { .. }));

        let err = BlockTimeline::new(&[block(100, 1000), block(100, 1000)], 3000).unwrap_err();
        assert!(matches!(err, ReplayError::UnorderedBlocks { .. }));
    }

    #[test]
    fn rejects_timestamp_regression() {
        let err = BlockTimeline::new(&[block(200, 1000), block(100, 2000)], 3000).unwrap_err();
        assert!(matches!(err, ReplayError::TimestampRegression { .. }));
    }

    #[test]
    fn unknown_height_is_missing_timestamp() {
        let timeline = BlockTimeline::new(&[block(100, 1000)], 2000).unwrap();
        assert!(matches!(
            timeline.window(99),
            Err(ReplayError::MissingTimestamp { height: 99 })
        ));
        assert_eq!(timeline.timestamp_of(100).unwrap(), 1000);
    }
}
