//! Transaction and composition error types.

use omni_core::AssetId;
use thiserror::Error;

/// Wire encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxnError {
    #[error("Transaction encoding failed: {0}")]
    Encode(String),

    #[error("Transaction decoding failed: {0}")]
    Decode(String),
}

/// Local, fail-fast composition errors.
///
/// Raised before any signing; a group that fails composition is never
/// submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("Invalid price: must be positive")]
    InvalidPrice,

    #[error("Invalid royalty: {bps} bps exceeds 10000")]
    InvalidRoyalty { bps: u64 },

    #[error("Unknown listing for asset {asset_id}")]
    UnknownListing { asset_id: AssetId },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid asset parameters: {0}")]
    InvalidAssetParams(String),

    #[error("Note too large: {len} bytes (max {max})")]
    NoteTooLarge { len: usize, max: usize },

    #[error("Method call at member {member} is missing its transaction references")]
    MissingReference { member: usize },

    #[error("Operation group is empty")]
    EmptyGroup,

    #[error("Operation group has {len} members (max {max})")]
    GroupTooLarge { len: usize, max: usize },

    #[error(transparent)]
    Txn(#[from] TxnError),
}

impl CompositionError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidPrice => "invalid_price",
            Self::InvalidRoyalty { .. } => "invalid_royalty",
            Self::UnknownListing { .. } => "unknown_listing",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidAssetParams(_) => "invalid_asset_params",
            Self::NoteTooLarge { .. } => "note_too_large",
            Self::MissingReference { .. } => "missing_reference",
            Self::EmptyGroup => "empty_group",
            Self::GroupTooLarge { .. } => "group_too_large",
            Self::Txn(_) => "encoding",
        }
    }
}

pub type TxnResult<T> = Result<T, TxnError>;
pub type CompositionResult<T> = Result<T, CompositionError>;
