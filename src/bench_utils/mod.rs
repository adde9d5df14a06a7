pub mod account_pool;
pub mod output_utils;
pub mod pair_selection;
pub mod splitter;
pub mod stats_accumulator;
