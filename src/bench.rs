use std::path::Path;

use crate::account::Address;
use crate::bench_utils::account_pool::AccountPool;
use crate::bench_utils::output_utils::{balance_line, write_key_list};
use crate::bench_utils::pair_selection::{pairs_per_round, plan_bulk_round};
use crate::bench_utils::splitter::{plan_split_round, SplitRound};
use crate::bench_utils::stats_accumulator::{BlockStatsAccumulator, Statistics};
use crate::chain::ChainClient;
use crate::error::{HarnessError, Result};
use crate::transfer_engine::TransferEngine;

use primitive_types::U256;
use rand::Rng;

/// Queries the chain balance of the first `count` accounts of the pool.
pub async fn report_balances<Client: ChainClient>(
    client: &Client,
    pool: &AccountPool,
    count: usize,
) -> Result<Vec<(Address, U256)>> {
    let icnt = pool.len().min(count);
    if icnt == pool.len() {
        tracing::info!("Get balances of all {} account(s)", pool.len());
    } else {
        tracing::info!(
            "Get balances of first {} out of {} account(s)",
            icnt,
            pool.len()
        );
    }

    let mut balances = Vec::with_capacity(icnt);
    for account in pool.iter().take(icnt) {
        let balance = client.balance(account.address()).await?;
        tracing::info!("{}", balance_line(account.address(), balance));
        balances.push((*account.address(), balance));
    }
    Ok(balances)
}

/// Grows the pool by splitting every account `rounds` times, then writes the
/// whole pool (original accounts first, then minted ones in round order) to
/// `destination`.
pub async fn split_and_persist<Client: ChainClient>(
    client: &Client,
    mut pool: AccountPool,
    rounds: usize,
    destination: &Path,
) -> Result<AccountPool> {
    if pool.is_empty() {
        return Err(HarnessError::InvalidInput(
            "cannot split an empty account pool".to_string(),
        ));
    }
    pool.refresh_estimates(client).await?;

    tracing::info!("Split {} account(s) {} time(s)", pool.len(), rounds);

    let engine = TransferEngine::new(client);
    for round in 0..rounds {
        tracing::info!(" - round {}", round + 1);
        let SplitRound { intents, minted } = plan_split_round(&mut pool)?;
        engine.execute_round(round, &pool, intents).await?;
        pool.extend(minted);
    }

    write_key_list(destination, &pool.key_list())?;
    tracing::info!(
        "Saved {} account(s) to {}",
        pool.len(),
        destination.display()
    );
    Ok(pool)
}

/// Runs `rounds` rounds of disjoint pairwise transfers and reports how they
/// were packed into blocks.
pub async fn bulk_transfer<Client: ChainClient, R: Rng>(
    client: &Client,
    pool: &mut AccountPool,
    transfers_per_round: Option<usize>,
    rounds: usize,
    rng: &mut R,
) -> Result<Statistics> {
    let mut blocks = BlockStatsAccumulator::default();
    run_bulk_transfer(client, pool, transfers_per_round, rounds, rng, &mut blocks).await
}

/// Same as [`bulk_transfer`], leaving the per-block counts in `blocks`.
pub async fn run_bulk_transfer<Client: ChainClient, R: Rng>(
    client: &Client,
    pool: &mut AccountPool,
    transfers_per_round: Option<usize>,
    rounds: usize,
    rng: &mut R,
    blocks: &mut BlockStatsAccumulator,
) -> Result<Statistics> {
    if pool.len() < 2 {
        return Err(HarnessError::InsufficientAccounts {
            available: pool.len(),
        });
    }
    pool.refresh_estimates(client).await?;

    let no_of_transfers = pairs_per_round(transfers_per_round, pool.len());
    tracing::info!(
        "Send {} transfer(s) {} time(s)",
        no_of_transfers,
        rounds
    );

    let engine = TransferEngine::new(client);
    for round in 0..rounds {
        tracing::info!(" - round {}", round + 1);
        let intents = plan_bulk_round(pool, Some(no_of_transfers), rng)?;
        let outcomes = engine.execute_round(round, pool, intents).await?;
        blocks.add_outcomes(&outcomes);
    }

    blocks.summarize()
}
