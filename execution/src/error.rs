use nhbchain_types::escrow::EscrowInvariantError;
use nhbchain_types::fixed::FixedPointError;
use thiserror::Error;

/// Failure of a state engine operation.
///
/// Validation, not-found and invariant failures are detected before any write and leave state
/// untouched. [`Error::Persistence`] wraps backing-store failures; if a multi-record commit had
/// already partially landed, the compensating writes were attempted before it was returned.
#[derive(Debug, Error)]
pub enum Error {
    // Validation
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("unsupported token: {0}")]
    InvalidToken(String),
    #[error("address required")]
    InvalidAddress,
    #[error("storage key must not be empty")]
    InvalidKey,
    #[error("invalid vote: {0}")]
    InvalidVote(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("{0} record exceeds encoding limits")]
    Oversized(&'static str),
    #[error("invalid parameter {name}: {value}")]
    InvalidParam { name: &'static str, value: String },
    #[error(transparent)]
    InvalidEscrow(#[from] EscrowInvariantError),

    #[error("{0} not found")]
    NotFound(&'static str),

    // Domain state
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("caller not authorized")]
    Unauthorized,
    #[error("invalid preimage")]
    InvalidPreimage,
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("deadline not reached")]
    NotExpired,
    #[error("reward not due (next_eligible={next_eligible})")]
    NotDue { next_eligible: u64 },
    #[error("module paused: {0}")]
    Paused(&'static str),
    #[error("emission cap reached")]
    EmissionCapHit,
    #[error("conflicting record: {0}")]
    Conflict(&'static str),

    // Invariants
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("insufficient stake")]
    InsufficientStake,
    #[error("balance overflow")]
    Overflow,
    #[error("{0} overflow or negative")]
    OverflowOrNegative(&'static str),
    #[error("refund exceeds origin amount")]
    RefundExceedsOrigin,
    #[error("stored value has wrong kind (expected={expected}, found={found})")]
    Decode {
        expected: &'static str,
        found: &'static str,
    },

    #[error("persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl From<FixedPointError> for Error {
    fn from(_: FixedPointError) -> Self {
        Error::Overflow
    }
}

impl Error {
    /// Whether the failure came from the backing store rather than from the operation itself.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Error::Persistence(_))
    }
}
