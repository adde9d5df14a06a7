pub mod legacy_tx;
pub mod rpc;
pub mod simulated;

use crate::account::{Account, Address};
use crate::error::ChainError;
use async_trait::async_trait;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Success,
    Reverted,
}

/// Proof that a submitted transfer was included in a block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub status: TransferStatus,
}

/// The network side of a run: balance queries, submission and finalization.
///
/// `submit` must not suspend: it hands the transfer to the network (or to a
/// background task) and returns a handle right away, so a whole batch can be
/// in flight before the first `wait_finalized` call.
#[async_trait]
pub trait ChainClient: Send + Sync {
    type Pending: Send;

    async fn balance(&self, address: &Address) -> Result<U256, ChainError>;

    fn submit(
        &self,
        from: &Account,
        to: &Address,
        amount: U256,
    ) -> Result<Self::Pending, ChainError>;

    async fn wait_finalized(&self, pending: Self::Pending) -> Result<Receipt, ChainError>;
}

pub(crate) fn from_quantity(value: &str) -> Result<U256, ChainError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::MalformedResponse(format!("quantity {value} lacks 0x")))?;
    if digits.is_empty() {
        return Ok(U256::zero());
    }
    U256::from_str_radix(digits, 16)
        .map_err(|err| ChainError::MalformedResponse(format!("quantity {value}: {err:?}")))
}

pub(crate) fn quantity_u64(value: &str) -> Result<u64, ChainError> {
    let quantity = from_quantity(value)?;
    if quantity > U256::from(u64::MAX) {
        return Err(ChainError::MalformedResponse(format!(
            "quantity {value} does not fit u64"
        )));
    }
    Ok(quantity.as_u64())
}

#[cfg(test)]
mod tests {
    use crate::chain::{from_quantity, quantity_u64};
    use primitive_types::U256;

    #[test]
    fn quantities_use_hex_encoding() {
        assert_eq!(from_quantity("0x0").unwrap(), U256::zero());
        assert_eq!(from_quantity("0x3e8").unwrap(), U256::from(1_000u64));
        assert_eq!(
            from_quantity("0xde0b6b3a7640000").unwrap(),
            U256::exp10(18)
        );
        assert!(from_quantity("1000").is_err());
        assert_eq!(quantity_u64("0x10e").unwrap(), 270);
        assert!(quantity_u64("0x10000000000000000").is_err());
    }
}
