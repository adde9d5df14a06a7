use crate::bench_utils::account_pool::AccountPool;
use crate::error::{HarnessError, Result};
use crate::transfer_engine::TransferIntent;
use primitive_types::U256;
use rand::Rng;

/// Share of the sender's estimate moved by one bulk transfer.
pub const TRANSFER_DIVISOR: u64 = 10;

/// Number of pairs a round forms: the request, capped by what a pool of
/// `pool_size` accounts can provide. `None` asks for the cap.
pub fn pairs_per_round(requested: Option<usize>, pool_size: usize) -> usize {
    let available = pool_size / 2;
    requested.map_or(available, |requested| requested.min(available))
}

/// Picks disjoint `(from, to)` index pairs by uniform draws over the pool,
/// skipping slots consumed earlier in the round.
pub fn select_pairs<R: Rng>(
    pool_size: usize,
    requested: Option<usize>,
    rng: &mut R,
) -> Result<Vec<(usize, usize)>> {
    if pool_size < 2 {
        return Err(HarnessError::InsufficientAccounts {
            available: pool_size,
        });
    }
    let wanted = pairs_per_round(requested, pool_size);

    let mut slots: Vec<Option<usize>> = (0..pool_size).map(Some).collect();
    let mut pairs = Vec::with_capacity(wanted);
    let mut pending_from: Option<usize> = None;

    while pairs.len() < wanted {
        let selected = rng.gen_range(0..pool_size);
        let index = match slots[selected].take() {
            Some(index) => index,
            None => continue,
        };
        match pending_from.take() {
            None => pending_from = Some(index),
            Some(from) => pairs.push((from, index)),
        }
    }

    Ok(pairs)
}

/// Plans one bulk-transfer round: selects the pairs, moves a tenth of each
/// sender's estimate to its receiver and returns the intents.
pub fn plan_bulk_round<R: Rng>(
    pool: &mut AccountPool,
    requested: Option<usize>,
    rng: &mut R,
) -> Result<Vec<TransferIntent>> {
    let pairs = select_pairs(pool.len(), requested, rng)?;
    let mut intents = Vec::with_capacity(pairs.len());
    for (from, to) in pairs {
        let (amount, receiver) = match (pool.account(from), pool.account(to)) {
            (Some(sender), Some(receiver)) => (
                sender.estimated_balance() / U256::from(TRANSFER_DIVISOR),
                *receiver.address(),
            ),
            _ => {
                return Err(HarnessError::InvalidInput(format!(
                    "pair ({from}, {to}) is outside the pool"
                )))
            }
        };
        pool.debit(from, amount)?;
        pool.credit(to, amount)?;
        intents.push(TransferIntent {
            from,
            to: receiver,
            amount,
        });
    }
    Ok(intents)
}
