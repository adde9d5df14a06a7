use thiserror::Error;

/// Failures reported by a [`crate::chain::ChainClient`].
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("transfer rejected: {0}")]
    Rejected(String),
    #[error("transfer {tx_hash} reverted in block {block_number}")]
    Reverted { tx_hash: String, block_number: u64 },
    #[error("transfer {0} was not finalized in time")]
    Timeout(String),
    #[error("submission task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not enough accounts to form a transfer pair: {available} available")]
    InsufficientAccounts { available: usize },
    #[error("round {round}: submission of transfer #{index} failed: {source}")]
    SubmissionFailure {
        round: usize,
        index: usize,
        #[source]
        source: ChainError,
    },
    #[error("round {round}: finalization of transfer #{index} failed: {source}")]
    FinalizationFailure {
        round: usize,
        index: usize,
        #[source]
        source: ChainError,
    },
    #[error("no receipts available to compute block statistics")]
    AggregationFailure,
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HarnessError {
    /// Round at which a submission or finalization failure happened.
    pub fn round(&self) -> Option<usize> {
        match self {
            HarnessError::SubmissionFailure { round, .. }
            | HarnessError::FinalizationFailure { round, .. } => Some(*round),
            _ => None,
        }
    }
}

pub type Result<T, E = HarnessError> = std::result::Result<T, E>;
