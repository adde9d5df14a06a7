use crate::account::{Account, Address};
use crate::chain::ChainClient;
use crate::error::{HarnessError, Result};
use futures::{StreamExt, TryStreamExt};
use primitive_types::U256;

use std::str::FromStr;

/// Balance queries kept in flight at once while refreshing estimates.
pub const REFRESH_PARALLELISM: usize = 32;

/// Where the keys of a run come from. Exactly one of the two must be set.
#[derive(Clone, Debug, Default)]
pub struct KeySource {
    pub key_list: Option<Vec<String>>,
    pub single_key: Option<String>,
}

impl KeySource {
    pub fn from_key_list(keys: Vec<String>) -> Self {
        Self {
            key_list: Some(keys),
            single_key: None,
        }
    }

    pub fn from_single_key(key: impl Into<String>) -> Self {
        Self {
            key_list: None,
            single_key: Some(key.into()),
        }
    }
}

/// All accounts of a run together with their estimated balances.
///
/// Estimates are seeded once from the chain by [`AccountPool::refresh_estimates`]
/// and afterwards only move through [`AccountPool::debit`] and
/// [`AccountPool::credit`] while transfers are planned. They are never
/// re-synchronized mid-run, so a transfer that fails after submission leaves
/// the estimate ahead of the chain.
#[derive(Clone, Debug, Default)]
pub struct AccountPool {
    accounts: Vec<Account>,
}

impl AccountPool {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    pub fn load(source: KeySource) -> Result<Self> {
        let keys = match source {
            KeySource {
                key_list: Some(_),
                single_key: Some(_),
            } => {
                return Err(HarnessError::InvalidInput(
                    "provide either a key list or a single key, not both".to_string(),
                ))
            }
            KeySource {
                key_list: Some(keys),
                single_key: None,
            } => keys,
            KeySource {
                key_list: None,
                single_key: Some(key),
            } => vec![key],
            KeySource {
                key_list: None,
                single_key: None,
            } => {
                return Err(HarnessError::InvalidInput(
                    "should provide either a key list or a private key".to_string(),
                ))
            }
        };

        let accounts = keys
            .iter()
            .map(|key| Account::from_str(key))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!("loaded {} account(s)", accounts.len());
        Ok(Self { accounts })
    }

    pub async fn refresh_estimates<Client: ChainClient>(&mut self, client: &Client) -> Result<()> {
        let queries = self
            .accounts
            .iter()
            .map(|account| client.balance(account.address()));
        let balances: Vec<U256> = futures::stream::iter(queries)
            .buffered(REFRESH_PARALLELISM)
            .try_collect()
            .await?;
        for (account, balance) in self.accounts.iter_mut().zip(balances) {
            account.set_estimated_balance(balance);
        }
        Ok(())
    }

    pub fn debit(&mut self, index: usize, amount: U256) -> Result<()> {
        let account = self.account_mut(index)?;
        let balance = account
            .estimated_balance()
            .checked_sub(amount)
            .ok_or_else(|| {
                HarnessError::InvalidInput(format!(
                    "cannot debit {} from {} holding an estimated {}",
                    amount,
                    account.address(),
                    account.estimated_balance()
                ))
            })?;
        account.set_estimated_balance(balance);
        Ok(())
    }

    pub fn credit(&mut self, index: usize, amount: U256) -> Result<()> {
        let account = self.account_mut(index)?;
        let balance = account
            .estimated_balance()
            .checked_add(amount)
            .ok_or_else(|| {
                HarnessError::InvalidInput(format!("estimate of {} overflows", account.address()))
            })?;
        account.set_estimated_balance(balance);
        Ok(())
    }

    pub fn push(&mut self, account: Account) {
        self.accounts.push(account);
    }

    pub fn extend(&mut self, accounts: impl IntoIterator<Item = Account>) {
        self.accounts.extend(accounts);
    }

    pub fn account(&self, index: usize) -> Option<&Account> {
        self.accounts.get(index)
    }

    fn account_mut(&mut self, index: usize) -> Result<&mut Account> {
        let len = self.accounts.len();
        self.accounts.get_mut(index).ok_or_else(|| {
            HarnessError::InvalidInput(format!("account #{index} out of a pool of {len}"))
        })
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.accounts.iter().map(|account| *account.address()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn key_list(&self) -> Vec<String> {
        self.accounts
            .iter()
            .map(|account| account.key().to_hex_string())
            .collect()
    }

    pub fn total_estimated(&self) -> U256 {
        self.accounts
            .iter()
            .fold(U256::zero(), |total, account| {
                total.saturating_add(account.estimated_balance())
            })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
