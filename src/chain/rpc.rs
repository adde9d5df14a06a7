use crate::account::{Account, Address};
use crate::chain::legacy_tx::{LegacyTransaction, TRANSFER_GAS};
use crate::chain::{from_quantity, quantity_u64, ChainClient, Receipt, TransferStatus};
use crate::error::ChainError;
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use primitive_types::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Upper bound of a single JSON-RPC round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const NO_PARAMS: [(); 0] = [];

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

impl RpcReceipt {
    fn into_receipt(self) -> Result<Option<Receipt>, ChainError> {
        let block_number = match self.block_number {
            // some nodes return the receipt before the block is sealed
            None => return Ok(None),
            Some(block_number) => quantity_u64(&block_number)?,
        };
        let status = match self.status.as_deref() {
            Some("0x0") => TransferStatus::Reverted,
            _ => TransferStatus::Success,
        };
        Ok(Some(Receipt {
            tx_hash: self.transaction_hash,
            block_number,
            status,
        }))
    }
}

struct RpcTransport {
    client: reqwest::Client,
    endpoint: String,
    next_id: AtomicU64,
    chain_id: OnceCell<u64>,
}

impl RpcTransport {
    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<T>, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response: JsonRpcResponse<T> = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result)
    }

    async fn call_quantity<P: Serialize>(
        &self,
        method: &str,
        params: P,
    ) -> Result<String, ChainError> {
        let quantity: Option<String> = self.call(method, params).await?;
        quantity.ok_or_else(|| ChainError::MalformedResponse(format!("{method} returned null")))
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        let chain_id = self
            .chain_id
            .get_or_try_init(|| async {
                let chain_id = self.call_quantity("eth_chainId", NO_PARAMS).await?;
                quantity_u64(&chain_id)
            })
            .await?;
        Ok(*chain_id)
    }

    /// Signs a plain value transfer with the sender's key and broadcasts it.
    /// The nonce is the sender's pending transaction count, so a sender must
    /// not have two transfers being built at once.
    async fn send_transfer(
        &self,
        key: SigningKey,
        from: Address,
        to: Address,
        value: U256,
    ) -> Result<String, ChainError> {
        let nonce = from_quantity(
            &self
                .call_quantity("eth_getTransactionCount", (from, "pending"))
                .await?,
        )?;
        let gas_price = from_quantity(&self.call_quantity("eth_gasPrice", NO_PARAMS).await?)?;
        let transaction = LegacyTransaction {
            chain_id: self.chain_id().await?,
            nonce,
            gas_price,
            gas: TRANSFER_GAS,
            to,
            value,
        };
        let signed = transaction.sign(&key)?;
        tracing::trace!("{} sends {} with nonce {}", from, signed.tx_hash, nonce);

        let tx_hash: Option<String> = self
            .call("eth_sendRawTransaction", [signed.raw_hex()])
            .await?;
        Ok(tx_hash.unwrap_or(signed.tx_hash))
    }
}

pub struct RpcPending {
    sender: Address,
    handle: JoinHandle<Result<String, ChainError>>,
}

/// Ethereum JSON-RPC client. Transfers are signed locally with the pool's
/// keys and broadcast through `eth_sendRawTransaction`.
pub struct RpcClient {
    transport: Arc<RpcTransport>,
    poll_interval: Duration,
    finalization_timeout: Duration,
}

impl RpcClient {
    pub fn new(
        endpoint: impl Into<String>,
        poll_interval: Duration,
        finalization_timeout: Duration,
    ) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_http_client(
            client,
            endpoint,
            poll_interval,
            finalization_timeout,
        ))
    }

    fn with_http_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        poll_interval: Duration,
        finalization_timeout: Duration,
    ) -> Self {
        Self {
            transport: Arc::new(RpcTransport {
                client,
                endpoint: endpoint.into(),
                next_id: AtomicU64::new(1),
                chain_id: OnceCell::new(),
            }),
            poll_interval,
            finalization_timeout,
        }
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<Receipt, ChainError> {
        loop {
            let receipt: Option<RpcReceipt> = self
                .transport
                .call("eth_getTransactionReceipt", [tx_hash])
                .await?;
            if let Some(receipt) = receipt {
                if let Some(receipt) = receipt.into_receipt()? {
                    return Ok(receipt);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    type Pending = RpcPending;

    async fn balance(&self, address: &Address) -> Result<U256, ChainError> {
        let balance = self
            .transport
            .call_quantity("eth_getBalance", (address, "latest"))
            .await?;
        from_quantity(&balance)
    }

    fn submit(
        &self,
        from: &Account,
        to: &Address,
        amount: U256,
    ) -> Result<Self::Pending, ChainError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| ChainError::Rejected(format!("no async runtime: {err}")))?;
        let transport = self.transport.clone();
        let key = from.key().signing_key();
        let sender = *from.address();
        let to = *to;
        let handle = runtime
            .spawn(async move { transport.send_transfer(key, sender, to, amount).await });
        Ok(RpcPending { sender, handle })
    }

    /// Waits for the broadcast and then for the receipt, both under one
    /// `finalization_timeout` deadline.
    async fn wait_finalized(&self, pending: Self::Pending) -> Result<Receipt, ChainError> {
        let deadline = Instant::now() + self.finalization_timeout;
        let RpcPending { sender, handle } = pending;
        let tx_hash = match tokio::time::timeout_at(deadline, handle).await {
            Ok(submitted) => submitted??,
            Err(_) => return Err(ChainError::Timeout(format!("from {sender}"))),
        };
        tokio::time::timeout_at(deadline, self.poll_receipt(&tx_hash))
            .await
            .map_err(|_| ChainError::Timeout(tx_hash.clone()))?
    }
}
