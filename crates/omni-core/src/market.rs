//! Identifiers and amounts for marketplace assets.
//!
//! Assets and applications on the ledger are identified by unsigned 64-bit
//! indices. Amounts are carried in the ledger's smallest unit (micro-units,
//! 10^-6 of a whole unit).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::digest::sha512_256;

/// Number of decimals in the native currency.
pub const NATIVE_DECIMALS: u32 = 6;

/// Asset identifier (also the registry key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl AssetId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn index(&self) -> u64 {
        self.0
    }

    /// Registry key bytes: raw big-endian u64.
    pub fn to_key(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Parse a registry key. Returns `None` unless `key` is exactly 8 bytes.
    pub fn from_key(key: &[u8]) -> Option<Self> {
        let raw: [u8; 8] = key.try_into().ok()?;
        Some(Self(u64::from_be_bytes(raw)))
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Application (contract) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppId(pub u64);

impl AppId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn index(&self) -> u64 {
        self.0
    }

    /// Custody account controlled by the application.
    ///
    /// `sha512_256("appID" || be_u64(app_id))`
    pub fn address(&self) -> Address {
        Address::new(sha512_256(&[b"appID", &self.0.to_be_bytes()]))
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Amount of the native currency in micro-units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct MicroAlgos(pub u64);

impl MicroAlgos {
    pub const ZERO: Self = Self(0);

    pub fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Amount in whole units (6 decimal places).
    pub fn to_algos(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), NATIVE_DECIMALS)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_mul(self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor).map(Self)
    }
}

impl fmt::Display for MicroAlgos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
