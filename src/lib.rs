pub mod account;
pub mod bench;
pub mod bench_utils;
pub mod chain;
pub mod config;
pub mod error;
pub mod transfer_engine;
