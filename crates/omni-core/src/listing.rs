//! Listing Codec for on-ledger registry records.
//!
//! Registry layout: key = big-endian `u64` asset id (8 bytes), value = the
//! fixed 80-byte record
//!
//! ```text
//! seller(32) || price(8, BE) || creator(32) || royalty_bps(8, BE)
//! ```
//!
//! Any value of a different length is invalid and is rejected, never
//! best-effort parsed.

use serde::{Deserialize, Serialize};

use crate::address::{Address, ADDRESS_LEN};
use crate::error::DecodeError;
use crate::market::{AssetId, MicroAlgos};

/// Exact encoded size of a [`ListingRecord`] value.
pub const LISTING_RECORD_LEN: usize = 80;

/// Exact size of a registry key.
pub const LISTING_KEY_LEN: usize = 8;

/// Upper bound for royalties (100%).
pub const MAX_ROYALTY_BPS: u64 = 10_000;

/// Platform fee retained by the marketplace contract on every sale.
pub const PLATFORM_FEE_BPS: u64 = 100;

const SELLER: std::ops::Range<usize> = 0..32;
const PRICE: std::ops::Range<usize> = 32..40;
const CREATOR: std::ops::Range<usize> = 40..72;
const ROYALTY: std::ops::Range<usize> = 72..80;

/// One asset currently offered for sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Registry key.
    pub asset_id: AssetId,
    pub seller: Address,
    pub price: MicroAlgos,
    /// Royalty beneficiary.
    pub creator: Address,
    pub royalty_bps: u64,
}

impl ListingRecord {
    /// Encode the registry value (the asset id lives in the key).
    pub fn encode(&self) -> [u8; LISTING_RECORD_LEN] {
        let mut out = [0u8; LISTING_RECORD_LEN];
        out[SELLER].copy_from_slice(self.seller.as_bytes());
        out[PRICE].copy_from_slice(&self.price.get().to_be_bytes());
        out[CREATOR].copy_from_slice(self.creator.as_bytes());
        out[ROYALTY].copy_from_slice(&self.royalty_bps.to_be_bytes());
        out
    }

    /// Decode a registry value stored under `asset_id`.
    ///
    /// Fails with [`DecodeError::InvalidLength`] unless `bytes` is exactly
    /// [`LISTING_RECORD_LEN`] long.
    pub fn decode(asset_id: AssetId, bytes: &[u8]) -> Result<Self, DecodeError> {
        let raw: &[u8; LISTING_RECORD_LEN] =
            bytes.try_into().map_err(|_| DecodeError::InvalidLength {
                expected: LISTING_RECORD_LEN,
                actual: bytes.len(),
            })?;

        Ok(Self {
            asset_id,
            seller: Address::new(read_address(&raw[SELLER])),
            price: MicroAlgos::new(read_u64(&raw[PRICE])),
            creator: Address::new(read_address(&raw[CREATOR])),
            royalty_bps: read_u64(&raw[ROYALTY]),
        })
    }

    /// Decode a full registry entry (key and value).
    pub fn decode_entry(key: &[u8], value: &[u8]) -> Result<Self, DecodeError> {
        let asset_id = AssetId::from_key(key).ok_or(DecodeError::InvalidKeyLength {
            expected: LISTING_KEY_LEN,
            actual: key.len(),
        })?;
        Self::decode(asset_id, value)
    }

    /// How the contract splits `price` on a sale.
    pub fn payout_split(&self) -> PayoutSplit {
        PayoutSplit::compute(self.price, self.royalty_bps, PLATFORM_FEE_BPS)
    }
}

fn read_address(bytes: &[u8]) -> [u8; ADDRESS_LEN] {
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(bytes);
    out
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut out = [0u8; 8];
    out.copy_from_slice(bytes);
    u64::from_be_bytes(out)
}

/// Result of decoding one entry of a heterogeneous registry.
///
/// Scanners filter on `Skip` rather than aborting on the first bad entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    Valid(ListingRecord),
    Skip(DecodeError),
}

impl DecodeResult {
    pub fn from_entry(key: &[u8], value: &[u8]) -> Self {
        match ListingRecord::decode_entry(key, value) {
            Ok(record) => Self::Valid(record),
            Err(reason) => Self::Skip(reason),
        }
    }

    pub fn valid(self) -> Option<ListingRecord> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Skip(_) => None,
        }
    }
}

/// Sale proceeds as distributed by the contract.
///
/// platform = price * platform_bps / 10000, royalty = price * royalty_bps /
/// 10000 (both floored), seller receives the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSplit {
    pub platform: MicroAlgos,
    pub royalty: MicroAlgos,
    pub seller: MicroAlgos,
}

impl PayoutSplit {
    pub fn compute(price: MicroAlgos, royalty_bps: u64, platform_bps: u64) -> Self {
        let share = |bps: u64| -> u64 {
            let v = u128::from(price.get()) * u128::from(bps) / u128::from(MAX_ROYALTY_BPS);
            u64::try_from(v).unwrap_or(u64::MAX)
        };
        let platform = share(platform_bps);
        let royalty = share(royalty_bps);
        let seller = price.get().saturating_sub(platform).saturating_sub(royalty);
        Self {
            platform: MicroAlgos::new(platform),
            royalty: MicroAlgos::new(royalty),
            seller: MicroAlgos::new(seller),
        }
    }
}
