//! Core domain types for the omni asset marketplace.
//!
//! This crate provides the fundamental types shared by every layer:
//! - `Address`: 32-byte ledger address with checksummed string form
//! - `AssetId`, `AppId`, `MicroAlgos`: identifiers and amounts
//! - `ListingRecord`: the fixed 80-byte registry record and its codec
//! - `SignedCredentialContext`: explicit routing of an address to a signer

pub mod address;
pub mod credential;
pub mod digest;
pub mod error;
pub mod listing;
pub mod market;

pub use address::{Address, ADDRESS_LEN};
pub use credential::{BackendKind, SignedCredentialContext};
pub use digest::sha512_256;
pub use error::{CoreError, DecodeError, Result};
pub use listing::{
    DecodeResult, ListingRecord, PayoutSplit, LISTING_KEY_LEN, LISTING_RECORD_LEN,
    MAX_ROYALTY_BPS, PLATFORM_FEE_BPS,
};
pub use market::{AppId, AssetId, MicroAlgos, NATIVE_DECIMALS};
