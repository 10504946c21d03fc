//! Ledger transactions and marketplace group composition.
//!
//! - `transaction`: wire model, canonical encoding, transaction and group ids
//! - `abi`: contract method selectors and argument encoding
//! - `group`: `OperationGroup`, the atomically-bound member sequence
//! - `composer`: builds list/buy/cancel (and supporting) groups

pub mod abi;
pub mod composer;
pub mod error;
pub mod group;
pub mod params;
pub mod transaction;

pub use abi::{Method, MethodCallBuilder};
pub use composer::{
    BuyOptions, Composer, ListRequest, ListingState, MintRequest, StorageCostSchedule,
    DEFAULT_VALIDITY_WINDOW, MAX_NOTE_LEN,
};
pub use error::{CompositionError, CompositionResult, TxnError, TxnResult};
pub use group::{GroupMember, MarketAction, MemberRole, OperationGroup, MAX_GROUP_SIZE};
pub use params::{SuggestedParams, DEFAULT_MIN_FEE};
pub use transaction::{
    compute_group_id, AssetParams, BoxReference, Digest32, SignedTransaction, Transaction, TxId,
    TxType,
};
