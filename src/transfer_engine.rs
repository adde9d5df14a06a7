use crate::account::Address;
use crate::bench_utils::account_pool::AccountPool;
use crate::chain::{ChainClient, Receipt, TransferStatus};
use crate::error::{ChainError, HarnessError, Result};
use primitive_types::U256;

/// A planned transfer. `from` indexes the pool; the amount is fixed when the
/// round is planned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferIntent {
    pub from: usize,
    pub to: Address,
    pub amount: U256,
}

#[derive(Clone, Debug)]
pub struct TransferOutcome {
    pub intent: TransferIntent,
    pub receipt: Receipt,
}

/// Runs rounds as submit-all followed by await-all in submission order.
pub struct TransferEngine<'a, Client: ChainClient> {
    client: &'a Client,
}

impl<'a, Client: ChainClient> TransferEngine<'a, Client> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &'a Client {
        self.client
    }

    /// Executes one planned round. The first rejected submission or failed
    /// finalization aborts the round; nothing is retried.
    pub async fn execute_round(
        &self,
        round: usize,
        pool: &AccountPool,
        intents: Vec<TransferIntent>,
    ) -> Result<Vec<TransferOutcome>> {
        let mut in_flight = Vec::with_capacity(intents.len());
        for (index, intent) in intents.into_iter().enumerate() {
            let sender = pool.account(intent.from).ok_or_else(|| {
                HarnessError::InvalidInput(format!(
                    "round {round}: transfer #{index} sends from unknown account #{}",
                    intent.from
                ))
            })?;
            let pending = self
                .client
                .submit(sender, &intent.to, intent.amount)
                .map_err(|source| HarnessError::SubmissionFailure {
                    round,
                    index,
                    source,
                })?;
            in_flight.push((intent, pending));
        }
        tracing::debug!("round {}: submitted {} transfer(s)", round, in_flight.len());

        let mut outcomes = Vec::with_capacity(in_flight.len());
        for (index, (intent, pending)) in in_flight.into_iter().enumerate() {
            let receipt = self.client.wait_finalized(pending).await.map_err(|source| {
                HarnessError::FinalizationFailure {
                    round,
                    index,
                    source,
                }
            })?;
            if receipt.status == TransferStatus::Reverted {
                return Err(HarnessError::FinalizationFailure {
                    round,
                    index,
                    source: ChainError::Reverted {
                        tx_hash: receipt.tx_hash,
                        block_number: receipt.block_number,
                    },
                });
            }
            outcomes.push(TransferOutcome { intent, receipt });
        }
        tracing::debug!("round {}: {} transfer(s) finalized", round, outcomes.len());

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use crate::account::{Account, Address};
    use crate::bench_utils::account_pool::AccountPool;
    use crate::chain::{ChainClient, Receipt, TransferStatus};
    use crate::error::{ChainError, HarnessError};
    use crate::transfer_engine::{TransferEngine, TransferIntent};
    use async_trait::async_trait;
    use primitive_types::U256;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Submit(u64),
        Await(u64),
    }

    #[derive(Default)]
    struct ScriptedChain {
        events: Mutex<Vec<Event>>,
        reject_submission: Option<u64>,
        revert: Option<u64>,
        time_out: Option<u64>,
        submitted: Mutex<u64>,
    }

    #[async_trait]
    impl ChainClient for ScriptedChain {
        type Pending = u64;

        async fn balance(&self, _address: &Address) -> Result<U256, ChainError> {
            Ok(U256::zero())
        }

        fn submit(
            &self,
            _from: &Account,
            _to: &Address,
            _amount: U256,
        ) -> Result<Self::Pending, ChainError> {
            let mut submitted = self.submitted.lock().unwrap();
            let ticket = *submitted;
            if self.reject_submission == Some(ticket) {
                return Err(ChainError::Rejected("malformed transfer".to_string()));
            }
            *submitted += 1;
            self.events.lock().unwrap().push(Event::Submit(ticket));
            Ok(ticket)
        }

        async fn wait_finalized(&self, ticket: u64) -> Result<Receipt, ChainError> {
            self.events.lock().unwrap().push(Event::Await(ticket));
            if self.time_out == Some(ticket) {
                return Err(ChainError::Timeout(format!("0x{ticket:x}")));
            }
            Ok(Receipt {
                tx_hash: format!("0x{ticket:x}"),
                block_number: 100 + ticket / 2,
                status: if self.revert == Some(ticket) {
                    TransferStatus::Reverted
                } else {
                    TransferStatus::Success
                },
            })
        }
    }

    fn round_of_five() -> (AccountPool, Vec<TransferIntent>) {
        let pool = AccountPool::new((0..10).map(|_| Account::generate()).collect());
        let intents = (0..5)
            .map(|i| TransferIntent {
                from: 2 * i,
                to: *pool.account(2 * i + 1).unwrap().address(),
                amount: U256::from(i as u64),
            })
            .collect();
        (pool, intents)
    }

    #[tokio::test]
    async fn submits_everything_before_awaiting_in_order() {
        let chain = ScriptedChain::default();
        let (pool, intents) = round_of_five();

        let outcomes = TransferEngine::new(&chain)
            .execute_round(0, &pool, intents.clone())
            .await
            .unwrap();

        let events = chain.events.lock().unwrap();
        let expected: Vec<_> = (0..5)
            .map(Event::Submit)
            .chain((0..5).map(Event::Await))
            .collect();
        assert_eq!(*events, expected);
        assert_eq!(outcomes.len(), 5);
        for (outcome, intent) in outcomes.iter().zip(intents) {
            assert_eq!(outcome.intent, intent);
        }
        assert_eq!(outcomes[4].receipt.block_number, 102);
    }

    #[tokio::test]
    async fn rejected_submission_aborts_the_round() {
        let chain = ScriptedChain {
            reject_submission: Some(2),
            ..Default::default()
        };
        let (pool, intents) = round_of_five();

        let err = TransferEngine::new(&chain)
            .execute_round(4, &pool, intents)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HarnessError::SubmissionFailure {
                round: 4,
                index: 2,
                ..
            }
        ));
        assert_eq!(err.round(), Some(4));
        // #4 and #5 never reached the chain and nothing was awaited
        let events = chain.events.lock().unwrap();
        assert_eq!(*events, vec![Event::Submit(0), Event::Submit(1)]);
    }

    #[tokio::test]
    async fn reverted_receipt_is_a_finalization_failure() {
        let chain = ScriptedChain {
            revert: Some(1),
            ..Default::default()
        };
        let (pool, intents) = round_of_five();

        let err = TransferEngine::new(&chain)
            .execute_round(0, &pool, intents)
            .await
            .unwrap_err();

        match err {
            HarnessError::FinalizationFailure {
                round: 0,
                index: 1,
                source: ChainError::Reverted { block_number, .. },
            } => assert_eq!(block_number, 100),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn timed_out_wait_stops_the_round() {
        let chain = ScriptedChain {
            time_out: Some(3),
            ..Default::default()
        };
        let (pool, intents) = round_of_five();

        let err = TransferEngine::new(&chain)
            .execute_round(2, &pool, intents)
            .await
            .unwrap_err();

        match &err {
            HarnessError::FinalizationFailure {
                round: 2,
                index: 3,
                source: ChainError::Timeout(tx_hash),
            } => assert_eq!(tx_hash, "0x3"),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.round(), Some(2));
        // all five were submitted, the last one is never awaited
        let events = chain.events.lock().unwrap();
        assert_eq!(events.len(), 9);
        assert_eq!(events.last(), Some(&Event::Await(3)));
    }
}
