//! Executor error types.
//!
//! Submission outcomes (`Confirmed`, `TimedOut`, `Rejected`) are values, not
//! errors; see `pipeline::TransactionOutcome`.

use omni_core::{Address, BackendKind};
use omni_txn::TxnError;
use thiserror::Error;

/// Failure reported by a signing backend for the whole call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

/// Signing pass errors. Any of these aborts the whole group; a partially
/// signed group is never submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    #[error("No {kind} signing backend associated with {address}")]
    BackendUnavailable { address: Address, kind: BackendKind },

    #[error("Signing rejected for member {index}")]
    SigningRejected { index: usize },

    #[error("Address {address} is routed to more than one backend within the group")]
    ConflictingBackends { address: Address },

    #[error("Signing backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Malformed signing response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Txn(#[from] TxnError),
}

impl SigningError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::SigningRejected { .. } => "rejected",
            Self::ConflictingBackends { .. } => "conflicting_backends",
            Self::Backend(_) => "backend_error",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Txn(_) => "encoding",
        }
    }
}

/// Node failure while reading state (not a refusal of a submission).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LedgerError(pub String);

/// Why a submission did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The node refused the group; terminal for this group instance.
    #[error("Submission rejected: {0}")]
    Rejected(String),

    /// No answer from the node; the group may or may not have been accepted.
    #[error("Submission transport failure: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Signing(#[from] SigningError),

    /// Submission outcome unknown; re-query ledger state before retrying.
    #[error("Transport failure during submission: {0}")]
    Transport(String),
}

pub type SigningResult<T> = Result<T, SigningError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
