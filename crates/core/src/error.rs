use thiserror::Error;

pub type RewardsResult<T> = Result<T, RewardsError>;

/// Domain validation failures from the points ledger. These are returned to
/// the caller as values so UI code can branch on them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient points: requested {requested}, available {available}")]
    InsufficientPoints { requested: u64, available: u64 },

    #[error("No free gifts available: earned {earned}, redeemed {redeemed}")]
    NoGiftsAvailable { earned: u32, redeemed: u32 },

    #[error("Invalid purchase amount: {amount}")]
    InvalidPurchaseAmount { amount: f64 },
}

#[derive(Error, Debug)]
pub enum RewardsError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Remote rewards service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote rewards service rejected request (HTTP {status}): {body}")]
    RemoteRejected { status: u16, body: String },

    #[error("Malformed local cache entry: {0}")]
    MalformedCache(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Rewards profile not loaded")]
    NotLoaded,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RewardsError {
    /// Whether this error came from the remote authority rather than local state.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            RewardsError::RemoteUnavailable(_) | RewardsError::RemoteRejected { .. }
        )
    }

    /// The domain validation failure, if this is one.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            RewardsError::Ledger(e) => Some(e),
            _ => None,
        }
    }
}
