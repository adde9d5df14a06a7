use std::path::{Path, PathBuf};

use anyhow::Context;

use clap::{Parser, Subcommand};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::prelude::*;

use bulk_transfer_harness::bench::{report_balances, run_bulk_transfer, split_and_persist};
use bulk_transfer_harness::bench_utils::account_pool::{AccountPool, KeySource};
use bulk_transfer_harness::bench_utils::output_utils::read_key_list;
use bulk_transfer_harness::bench_utils::stats_accumulator::BlockStatsAccumulator;
use bulk_transfer_harness::chain::rpc::RpcClient;
use bulk_transfer_harness::chain::simulated::SimulatedChain;
use bulk_transfer_harness::chain::ChainClient;
use bulk_transfer_harness::config::{ChainConfig, Config};

const DEFAULT_N_BALANCE: usize = 10;
const DEFAULT_SPLIT_OUTPUT: &str = "split_wallet.json";

#[derive(Parser, Debug)]
#[clap(version)]
pub struct Cli {
    /// path to config file
    #[clap(long, value_parser)]
    config_path: PathBuf,

    #[clap(subcommand)]
    task: Task,
}

#[derive(Subcommand, Debug)]
enum Task {
    /// Prints the balances of the first accounts of a list
    Balance {
        /// the account list json file
        #[clap(long, value_parser)]
        accounts_file: PathBuf,
        /// get only the first N account balances
        #[clap(long, value_parser, default_value_t = DEFAULT_N_BALANCE)]
        only_first: usize,
    },
    /// Splits the provided account list or private key N times
    Split {
        /// the account list json file
        #[clap(long, value_parser)]
        accounts_file: Option<PathBuf>,
        /// a single account private key
        #[clap(long, value_parser)]
        account: Option<String>,
        /// split iterations
        #[clap(long, value_parser, default_value_t = 2)]
        iterations: usize,
        /// file to save the grown account list to
        #[clap(long, value_parser)]
        output_file: Option<PathBuf>,
    },
    /// Sends rounds of transfers between random disjoint account pairs
    BulkTx {
        /// the account list json file
        #[clap(long, value_parser)]
        accounts_file: PathBuf,
        /// transfers per round, 0 pairs up the whole list
        #[clap(long, value_parser, default_value_t = 0)]
        transfers: usize,
        /// bulk transfer iterations
        #[clap(long, value_parser, default_value_t = 1)]
        iterations: usize,
        /// optional csv with the transfer count of every block
        #[clap(long, value_parser)]
        block_stats_path: Option<PathBuf>,
        /// seed for the pair selection
        #[clap(long, value_parser)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let result = _main().await;
    result.unwrap();
}

async fn _main() -> anyhow::Result<()> {
    // Start logging setup block
    let fmt_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry().with(fmt_layer).init();

    let Cli { config_path, task } = Cli::parse();

    tracing::info!("Config file {:?}", config_path);
    let config = Config::load(&config_path)?;

    match &config.chain {
        ChainConfig::Rpc { endpoint, .. } => {
            let client = RpcClient::new(
                endpoint.clone(),
                config.chain.poll_interval().unwrap_or_default(),
                config.chain.finalization_timeout().unwrap_or_default(),
            )
            .context("Failed to build RPC client")?;
            run_task(&client, task, |_| ()).await
        }
        ChainConfig::Simulated {
            block_capacity,
            first_block,
            ..
        } => {
            let genesis_balance = config.chain.genesis_balance()?;
            let chain = SimulatedChain::new(*block_capacity, *first_block);
            tracing::info!(
                "Running against a simulated chain, {} per account",
                genesis_balance
            );
            run_task(&chain, task, |pool| {
                for address in pool.addresses() {
                    chain.fund(address, genesis_balance);
                }
            })
            .await
        }
    }
}

fn load_pool(accounts_file: &Path) -> anyhow::Result<AccountPool> {
    let keys = read_key_list(accounts_file).with_context(|| {
        format!(
            "Cannot read account list {path}",
            path = accounts_file.display()
        )
    })?;
    Ok(AccountPool::load(KeySource::from_key_list(keys))?)
}

async fn run_task<Client, Prepare>(
    client: &Client,
    task: Task,
    prepare: Prepare,
) -> anyhow::Result<()>
where
    Client: ChainClient,
    Prepare: Fn(&AccountPool),
{
    match task {
        Task::Balance {
            accounts_file,
            only_first,
        } => {
            let pool = load_pool(&accounts_file)?;
            prepare(&pool);
            report_balances(client, &pool, only_first).await?;
        }
        Task::Split {
            accounts_file,
            account,
            iterations,
            output_file,
        } => {
            let key_list = accounts_file
                .as_deref()
                .map(read_key_list)
                .transpose()
                .context("Cannot read account list")?;
            let pool = AccountPool::load(KeySource {
                key_list,
                single_key: account,
            })?;
            prepare(&pool);

            let destination = output_file
                .or(accounts_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SPLIT_OUTPUT));
            split_and_persist(client, pool, iterations, &destination).await?;

            report_balances(client, &load_pool(&destination)?, DEFAULT_N_BALANCE).await?;
        }
        Task::BulkTx {
            accounts_file,
            transfers,
            iterations,
            block_stats_path,
            seed,
        } => {
            let mut pool = load_pool(&accounts_file)?;
            prepare(&pool);

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut blocks = BlockStatsAccumulator::default();
            let statistics = run_bulk_transfer(
                client,
                &mut pool,
                // 0 on the command line pairs up the whole list
                Some(transfers).filter(|transfers| *transfers > 0),
                iterations,
                &mut rng,
                &mut blocks,
            )
            .await?;

            println!("\n{statistics}\n");
            tracing::info!(
                "Estimated pool total after the run: {}",
                pool.total_estimated()
            );
            if let Some(path) = block_stats_path {
                blocks.dump_stats(path)?;
            }

            report_balances(client, &pool, DEFAULT_N_BALANCE).await?;
        }
    }
    Ok(())
}
