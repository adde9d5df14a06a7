use anyhow::{anyhow, Context};
use primitive_types::U256;
use serde::Deserialize;

use std::fs::File;
use std::path::Path;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 500;
const DEFAULT_FINALIZATION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_BLOCK_CAPACITY: usize = 100;

fn default_poll_interval_millis() -> u64 {
    DEFAULT_POLL_INTERVAL_MILLIS
}

fn default_finalization_timeout_secs() -> u64 {
    DEFAULT_FINALIZATION_TIMEOUT_SECS
}

fn default_block_capacity() -> usize {
    DEFAULT_BLOCK_CAPACITY
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum ChainConfig {
    Rpc {
        endpoint: String,
        #[serde(default = "default_poll_interval_millis")]
        poll_interval_millis: u64,
        #[serde(default = "default_finalization_timeout_secs")]
        finalization_timeout_secs: u64,
    },
    /// In-process ledger, every loaded account starts with `genesis_balance`.
    Simulated {
        #[serde(default = "default_block_capacity")]
        block_capacity: usize,
        #[serde(default)]
        first_block: u64,
        /// decimal amount in base units
        #[serde(default)]
        genesis_balance: Option<String>,
    },
}

impl ChainConfig {
    pub fn poll_interval(&self) -> Option<Duration> {
        match self {
            ChainConfig::Rpc {
                poll_interval_millis,
                ..
            } => Some(Duration::from_millis(*poll_interval_millis)),
            ChainConfig::Simulated { .. } => None,
        }
    }

    pub fn finalization_timeout(&self) -> Option<Duration> {
        match self {
            ChainConfig::Rpc {
                finalization_timeout_secs,
                ..
            } => Some(Duration::from_secs(*finalization_timeout_secs)),
            ChainConfig::Simulated { .. } => None,
        }
    }

    pub fn genesis_balance(&self) -> anyhow::Result<U256> {
        match self {
            ChainConfig::Simulated {
                genesis_balance: Some(balance),
                ..
            } => U256::from_dec_str(balance)
                .map_err(|err| anyhow!("invalid genesis balance {balance}: {err:?}")),
            _ => Ok(U256::zero()),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Cannot read config file {path}", path = path.display()))?;
        let config: Config = serde_yaml::from_reader(file)
            .with_context(|| format!("Cannot read config file {path}", path = path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ChainConfig, Config};
    use primitive_types::U256;
    use std::time::Duration;

    #[test]
    fn parses_rpc_config_with_defaults() {
        let config: Config = serde_yaml::from_str(
            "
chain:
  type: rpc
  endpoint: http://localhost:3050
",
        )
        .unwrap();
        match &config.chain {
            ChainConfig::Rpc { endpoint, .. } => assert_eq!(endpoint, "http://localhost:3050"),
            other => panic!("unexpected chain config {other:?}"),
        }
        assert_eq!(config.chain.poll_interval(), Some(Duration::from_millis(500)));
        assert_eq!(
            config.chain.finalization_timeout(),
            Some(Duration::from_secs(120))
        );
        assert_eq!(config.chain.genesis_balance().unwrap(), U256::zero());
    }

    #[test]
    fn parses_simulated_config() {
        let config: Config = serde_yaml::from_str(
            "
chain:
  type: simulated
  block_capacity: 25
  genesis_balance: \"1000000000000000000000\"
",
        )
        .unwrap();
        assert!(matches!(
            config.chain,
            ChainConfig::Simulated {
                block_capacity: 25,
                first_block: 0,
                ..
            }
        ));
        assert_eq!(config.chain.genesis_balance().unwrap(), U256::exp10(21));
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(serde_yaml::from_str::<Config>(
            "
chain:
  type: rpc
  endpoint: http://localhost:3050
  retries: 3
"
        )
        .is_err());
    }
}
