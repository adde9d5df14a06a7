use crate::account::{Account, Address};
use crate::chain::{ChainClient, Receipt, TransferStatus};
use crate::error::ChainError;
use async_trait::async_trait;
use primitive_types::U256;

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

struct QueuedTransfer {
    ticket: u64,
    from: Address,
    to: Address,
    amount: U256,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<Address, U256>,
    mempool: VecDeque<QueuedTransfer>,
    receipts: HashMap<u64, Receipt>,
    next_ticket: u64,
    next_block: u64,
}

impl LedgerState {
    fn seal_block(&mut self, capacity: usize) {
        let block_number = self.next_block;
        self.next_block += 1;
        let count = capacity.min(self.mempool.len());
        for transfer in self.mempool.drain(..count) {
            let from_balance = self.balances.get(&transfer.from).cloned().unwrap_or_default();
            let status = if from_balance >= transfer.amount {
                self.balances
                    .insert(transfer.from, from_balance - transfer.amount);
                let to_balance = self.balances.entry(transfer.to).or_default();
                *to_balance = to_balance.saturating_add(transfer.amount);
                TransferStatus::Success
            } else {
                TransferStatus::Reverted
            };
            self.receipts.insert(
                transfer.ticket,
                Receipt {
                    tx_hash: format!("0x{:064x}", transfer.ticket),
                    block_number,
                    status,
                },
            );
        }
        tracing::debug!("sealed block {} with {} transfer(s)", block_number, count);
    }
}

#[derive(Debug)]
pub struct SimulatedPending {
    ticket: u64,
}

/// In-memory ledger that packs queued transfers into blocks of a fixed
/// capacity, in FIFO order. Blocks are sealed lazily while somebody waits for
/// a transfer that is still queued, which keeps runs deterministic.
pub struct SimulatedChain {
    state: Mutex<LedgerState>,
    block_capacity: usize,
}

impl SimulatedChain {
    pub fn new(block_capacity: usize, first_block: u64) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                next_block: first_block,
                ..Default::default()
            }),
            block_capacity: block_capacity.max(1),
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Credits `amount` to `address`, saturating at `U256::MAX`.
    pub fn fund(&self, address: Address, amount: U256) {
        let mut state = self.state();
        let balance = state.balances.entry(address).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance_of(&self, address: &Address) -> U256 {
        self.state()
            .balances
            .get(address)
            .cloned()
            .unwrap_or_default()
    }

    pub fn pending_transfers(&self) -> usize {
        self.state().mempool.len()
    }
}

#[async_trait]
impl ChainClient for SimulatedChain {
    type Pending = SimulatedPending;

    async fn balance(&self, address: &Address) -> Result<U256, ChainError> {
        Ok(self.balance_of(address))
    }

    fn submit(
        &self,
        from: &Account,
        to: &Address,
        amount: U256,
    ) -> Result<Self::Pending, ChainError> {
        if from.address() == to {
            return Err(ChainError::Rejected(format!(
                "{} cannot transfer to itself",
                to
            )));
        }
        let mut state = self.state();
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.mempool.push_back(QueuedTransfer {
            ticket,
            from: *from.address(),
            to: *to,
            amount,
        });
        Ok(SimulatedPending { ticket })
    }

    async fn wait_finalized(&self, pending: Self::Pending) -> Result<Receipt, ChainError> {
        let mut state = self.state();
        loop {
            if let Some(receipt) = state.receipts.remove(&pending.ticket) {
                return Ok(receipt);
            }
            if !state.mempool.iter().any(|queued| queued.ticket == pending.ticket) {
                return Err(ChainError::Timeout(format!("0x{:064x}", pending.ticket)));
            }
            state.seal_block(self.block_capacity);
        }
    }
}
