//! Ledger node access and listing discovery.
//!
//! - `client`: REST client for the node (params, submission, status, boxes, assets)
//! - `source`: registry and asset-metadata seams, with in-memory implementations
//! - `scanner`: re-enumerates the registry into `ListingView`s

pub mod client;
pub mod error;
pub mod scanner;
pub mod source;

pub use client::{AlgodClient, NodeRegistry, NodeStatus, PendingTransaction, DEFAULT_TIMEOUT};
pub use error::{RegistryError, RegistryResult};
pub use scanner::{
    placeholder_info, ListingScanner, ListingView, ScanReport, SkipReason, SkippedEntry,
    PLACEHOLDER_UNIT,
};
pub use source::{
    AssetInfo, AssetInfoSource, BoxFuture, DynAssetInfoSource, DynRegistrySource,
    InMemoryAssetInfo, InMemoryRegistry, LookupError, RegistrySource,
};
