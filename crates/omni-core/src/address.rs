//! Ledger account addresses.
//!
//! An address is a 32-byte public key. Its string form is the base32 (no
//! padding) encoding of the key followed by a 4-byte checksum taken from the
//! tail of `sha512_256(key)`, always 58 characters long.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::digest::sha512_256;
use crate::error::CoreError;

/// Length of a raw address in bytes.
pub const ADDRESS_LEN: usize = 32;

/// Length of the checksum appended before base32 encoding.
const CHECKSUM_LEN: usize = 4;

/// Length of the string form.
pub const ADDRESS_STR_LEN: usize = 58;

/// A 32-byte ledger address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    pub const fn new(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a byte slice of exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoreError> {
        let raw: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            CoreError::InvalidAddress(format!(
                "expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(raw))
    }

    /// Raw public key bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ADDRESS_LEN]
    }

    /// Checksummed string encoding. Total over all 32-byte inputs.
    pub fn encode(&self) -> String {
        let digest = sha512_256(&[&self.0]);
        let mut buf = [0u8; ADDRESS_LEN + CHECKSUM_LEN];
        buf[..ADDRESS_LEN].copy_from_slice(&self.0);
        buf[ADDRESS_LEN..].copy_from_slice(&digest[32 - CHECKSUM_LEN..]);
        BASE32_NOPAD.encode(&buf)
    }

    /// Parse a checksummed string address.
    pub fn decode(s: &str) -> Result<Self, CoreError> {
        if s.len() != ADDRESS_STR_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "expected {ADDRESS_STR_LEN} characters, got {}",
                s.len()
            )));
        }
        let buf = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| CoreError::InvalidAddress(format!("invalid base32: {e}")))?;
        if buf.len() != ADDRESS_LEN + CHECKSUM_LEN {
            return Err(CoreError::InvalidAddress(format!(
                "decoded to {} bytes",
                buf.len()
            )));
        }

        let address = Self::from_slice(&buf[..ADDRESS_LEN])?;
        let digest = sha512_256(&[&address.0]);
        if buf[ADDRESS_LEN..] != digest[32 - CHECKSUM_LEN..] {
            return Err(CoreError::InvalidAddress("checksum mismatch".to_string()));
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.encode())
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl From<[u8; ADDRESS_LEN]> for Address {
    fn from(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }
}

// Human-readable formats (JSON, TOML) carry the checksummed string; binary
// formats (msgpack) carry the raw 32 bytes as a bin field.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.encode())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::decode(&s).map_err(serde::de::Error::custom)
        } else {
            let buf = serde_bytes::ByteBuf::deserialize(deserializer)?;
            Self::from_slice(&buf).map_err(serde::de::Error::custom)
        }
    }
}
