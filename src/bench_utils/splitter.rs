use crate::account::Account;
use crate::bench_utils::account_pool::AccountPool;
use crate::error::Result;
use crate::transfer_engine::TransferIntent;
use primitive_types::U256;

/// One planned split round: the transfers to submit and the accounts they
/// fund, which join the pool once the round is finalized.
#[derive(Debug)]
pub struct SplitRound {
    pub intents: Vec<TransferIntent>,
    pub minted: Vec<Account>,
}

/// Plans a split over the pool as it is now: every account keeps the larger
/// half of its estimate and sends the floor half to a freshly generated
/// account. Zero amounts are planned like any other.
pub fn plan_split_round(pool: &mut AccountPool) -> Result<SplitRound> {
    let snapshot = pool.len();
    let mut intents = Vec::with_capacity(snapshot);
    let mut minted = Vec::with_capacity(snapshot);

    for from in 0..snapshot {
        let amount = match pool.account(from) {
            Some(account) => account.estimated_balance() / U256::from(2u64),
            None => break,
        };
        pool.debit(from, amount)?;

        let receiver = Account::generate().with_estimated_balance(amount);
        intents.push(TransferIntent {
            from,
            to: *receiver.address(),
            amount,
        });
        minted.push(receiver);
    }

    Ok(SplitRound { intents, minted })
}

#[cfg(test)]
mod tests {
    use crate::account::Account;
    use crate::bench_utils::account_pool::AccountPool;
    use crate::bench_utils::splitter::plan_split_round;
    use primitive_types::U256;

    #[test]
    fn halves_every_account_into_a_new_one() {
        let balances = [100u64, 64, 2];
        let mut pool = AccountPool::new(
            balances
                .iter()
                .map(|b| Account::generate().with_estimated_balance(U256::from(*b)))
                .collect(),
        );

        let round = plan_split_round(&mut pool).unwrap();
        assert_eq!(round.intents.len(), 3);
        assert_eq!(round.minted.len(), 3);
        // minted accounts join only after finalization
        assert_eq!(pool.len(), 3);

        for (i, balance) in balances.iter().enumerate() {
            let half = U256::from(balance / 2);
            assert_eq!(pool.account(i).unwrap().estimated_balance(), half);
            assert_eq!(round.minted[i].estimated_balance(), half);
            assert_eq!(round.intents[i].from, i);
            assert_eq!(round.intents[i].amount, half);
            assert_eq!(round.intents[i].to, *round.minted[i].address());
        }

        pool.extend(round.minted);
        assert_eq!(pool.len(), 6);
        assert_eq!(pool.total_estimated(), U256::from(166u64));
    }

    #[test]
    fn odd_and_tiny_balances() {
        let mut pool = AccountPool::new(vec![
            Account::generate().with_estimated_balance(U256::from(7u64)),
            Account::generate().with_estimated_balance(U256::one()),
            Account::generate(),
        ]);
        let round = plan_split_round(&mut pool).unwrap();

        assert_eq!(pool.account(0).unwrap().estimated_balance(), U256::from(4u64));
        assert_eq!(round.intents[0].amount, U256::from(3u64));
        // zero-amount transfers are still queued
        assert_eq!(round.intents[1].amount, U256::zero());
        assert_eq!(round.intents[2].amount, U256::zero());
        assert_eq!(pool.account(1).unwrap().estimated_balance(), U256::one());
    }
}
