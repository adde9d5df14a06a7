use crate::error::{HarnessError, Result};
use crate::transfer_engine::TransferOutcome;
use itertools::{Itertools, MinMaxResult};

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSummary {
    pub block_number: u64,
    pub transfer_count: u64,
}

/// Counts finalized transfers per block across every round of a run.
#[derive(Debug, Default)]
pub struct BlockStatsAccumulator {
    blocks: BTreeMap<u64, BlockSummary>,
}

impl BlockStatsAccumulator {
    pub fn add_block(&mut self, block_number: u64) {
        self.blocks
            .entry(block_number)
            .or_insert(BlockSummary {
                block_number,
                transfer_count: 0,
            })
            .transfer_count += 1;
    }

    pub fn add_outcomes(&mut self, outcomes: &[TransferOutcome]) {
        for outcome in outcomes {
            self.add_block(outcome.receipt.block_number);
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = &BlockSummary> {
        self.blocks.values()
    }

    pub fn summarize(&self) -> Result<Statistics> {
        let (low, high) = match self.blocks.values().map(|block| block.transfer_count).minmax() {
            MinMaxResult::NoElements => return Err(HarnessError::AggregationFailure),
            MinMaxResult::OneElement(count) => (count, count),
            MinMaxResult::MinMax(low, high) => (low, high),
        };
        // keys are ordered, so the span is the first and last entry
        let (first_block, last_block) = match (
            self.blocks.keys().next(),
            self.blocks.keys().next_back(),
        ) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(HarnessError::AggregationFailure),
        };
        let total_transfers: u64 = self.blocks.values().map(|block| block.transfer_count).sum();
        let blocks = self.blocks.len() as u64;

        Ok(Statistics {
            total_transfers,
            blocks,
            average_per_block: total_transfers as f64 / blocks as f64,
            min_per_block: low,
            max_per_block: high,
            first_block,
            last_block,
        })
    }

    pub fn dump_stats(&self, path: PathBuf) -> anyhow::Result<()> {
        let mut stats = File::create(path)?;
        stats.write_all("block_number,transfer_count\n".as_bytes())?;
        for block in self.blocks.values() {
            stats.write_all(
                format!("{},{}\n", block.block_number, block.transfer_count).as_bytes(),
            )?;
        }
        Ok(())
    }
}

/// How a run's transfers were packed into blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Statistics {
    pub total_transfers: u64,
    pub blocks: u64,
    pub average_per_block: f64,
    pub min_per_block: u64,
    pub max_per_block: u64,
    pub first_block: u64,
    pub last_block: u64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tTotal Transfers       : {}", self.total_transfers)?;
        writeln!(f, "\tNumber of Blocks      : {}", self.blocks)?;
        writeln!(
            f,
            "\tAverage Tx Per Block  : {}  , ({}/{})",
            self.average_per_block, self.min_per_block, self.max_per_block
        )?;
        write!(
            f,
            "\tFirst/Last Block ID   : {} / {}",
            self.first_block, self.last_block
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::bench_utils::stats_accumulator::{BlockStatsAccumulator, Statistics};
    use crate::error::HarnessError;

    #[test]
    fn summarizes_block_packing() {
        let mut acc = BlockStatsAccumulator::default();
        for block in [100, 100, 101] {
            acc.add_block(block);
        }
        assert_eq!(
            acc.summarize().unwrap(),
            Statistics {
                total_transfers: 3,
                blocks: 2,
                average_per_block: 1.5,
                min_per_block: 1,
                max_per_block: 2,
                first_block: 100,
                last_block: 101,
            }
        );
    }

    #[test]
    fn unordered_blocks_keep_their_span() {
        let mut acc = BlockStatsAccumulator::default();
        for block in [7, 3, 9, 3, 3] {
            acc.add_block(block);
        }
        let stats = acc.summarize().unwrap();
        assert_eq!((stats.first_block, stats.last_block), (3, 9));
        assert_eq!((stats.min_per_block, stats.max_per_block), (1, 3));
        assert!(stats.to_string().contains("First/Last Block ID   : 3 / 9"));
    }

    #[test]
    fn no_receipts_is_an_error() {
        let acc = BlockStatsAccumulator::default();
        assert!(matches!(
            acc.summarize(),
            Err(HarnessError::AggregationFailure)
        ));
    }

    #[test]
    fn dumps_csv_in_block_order() {
        let mut acc = BlockStatsAccumulator::default();
        for block in [5, 4, 5] {
            acc.add_block(block);
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.csv");
        acc.dump_stats(path.clone()).unwrap();
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "block_number,transfer_count\n4,1\n5,2\n"
        );
    }
}
