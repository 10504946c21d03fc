//! Ledger transaction model and canonical wire encoding.
//!
//! Transactions are encoded as msgpack maps with sorted keys and every
//! zero/empty field omitted. Struct fields below are declared in key order so
//! that `rmp_serde::to_vec_named` produces the canonical form directly.
//!
//! Reference: ledger node REST API `/v2/transactions` (raw msgpack body).

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use data_encoding::BASE32_NOPAD;
use omni_core::{sha512_256, Address};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::ByteBuf;

use crate::error::{TxnError, TxnResult};

/// Domain separation prefix for transaction ids.
const TX_PREFIX: &[u8] = b"TX";

/// Domain separation prefix for group ids.
const TX_GROUP_PREFIX: &[u8] = b"TG";

// =============================================================================
// Digest32
// =============================================================================

/// 32-byte hash carried as a bin field (base64 in human-readable formats).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest32(pub [u8; 32]);

impl Digest32 {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn from_base64(s: &str) -> TxnResult<Self> {
        let bytes = BASE64
            .decode(s)
            .map_err(|e| TxnError::Decode(format!("invalid base64 digest: {e}")))?;
        let raw: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| {
                TxnError::Decode(format!("digest must be 32 bytes, got {}", bytes.len()))
            })?;
        Ok(Self(raw))
    }
}

impl fmt::Debug for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest32({})", self.to_base64())
    }
}

impl fmt::Display for Digest32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl Serialize for Digest32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_base64())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Digest32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            Self::from_base64(&s).map_err(serde::de::Error::custom)
        } else {
            let buf = ByteBuf::deserialize(deserializer)?;
            let raw: [u8; 32] = buf.as_slice().try_into().map_err(|_| {
                serde::de::Error::custom(format!("digest must be 32 bytes, got {}", buf.len()))
            })?;
            Ok(Self(raw))
        }
    }
}

// =============================================================================
// TxType
// =============================================================================

/// Transaction type tag (`type` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TxType {
    #[default]
    Payment,
    AssetTransfer,
    AssetConfig,
    AppCall,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "pay",
            Self::AssetTransfer => "axfer",
            Self::AssetConfig => "acfg",
            Self::AppCall => "appl",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "pay" => Some(Self::Payment),
            "axfer" => Some(Self::AssetTransfer),
            "acfg" => Some(Self::AssetConfig),
            "appl" => Some(Self::AppCall),
            _ => None,
        }
    }
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TxType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown transaction type: {s}")))
    }
}

// =============================================================================
// Nested wire structs
// =============================================================================

fn is_zero(v: &u64) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// Box reference attached to an application call.
///
/// `i` is the index into the foreign-app array; 0 means the called app.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxReference {
    #[serde(rename = "i", skip_serializing_if = "is_zero")]
    pub app_index: u64,
    #[serde(rename = "n", with = "serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<u8>,
}

impl BoxReference {
    /// Reference to a box of the called application.
    pub fn own(name: impl Into<Vec<u8>>) -> Self {
        Self {
            app_index: 0,
            name: name.into(),
        }
    }
}

/// Asset creation parameters (`apar`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetParams {
    #[serde(rename = "an", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(rename = "au", skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub clawback: Option<Address>,
    #[serde(rename = "dc", skip_serializing_if = "is_zero")]
    pub decimals: u64,
    #[serde(rename = "df", skip_serializing_if = "is_false")]
    pub default_frozen: bool,
    #[serde(rename = "f", skip_serializing_if = "Option::is_none")]
    pub freeze: Option<Address>,
    #[serde(rename = "m", skip_serializing_if = "Option::is_none")]
    pub manager: Option<Address>,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub reserve: Option<Address>,
    #[serde(rename = "t", skip_serializing_if = "is_zero")]
    pub total: u64,
    #[serde(rename = "un", skip_serializing_if = "String::is_empty")]
    pub unit_name: String,
}

// =============================================================================
// Transaction
// =============================================================================

/// One ledger transaction (unsigned).
///
/// Field declaration order is the canonical key order; do not reorder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    #[serde(rename = "aamt", skip_serializing_if = "is_zero")]
    pub asset_amount: u64,
    #[serde(rename = "amt", skip_serializing_if = "is_zero")]
    pub amount: u64,
    #[serde(rename = "apaa", skip_serializing_if = "Vec::is_empty")]
    pub app_args: Vec<ByteBuf>,
    #[serde(rename = "apan", skip_serializing_if = "is_zero")]
    pub on_complete: u64,
    #[serde(rename = "apar", skip_serializing_if = "Option::is_none")]
    pub asset_params: Option<AssetParams>,
    #[serde(rename = "apas", skip_serializing_if = "Vec::is_empty")]
    pub foreign_assets: Vec<u64>,
    #[serde(rename = "apat", skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<Address>,
    #[serde(rename = "apbx", skip_serializing_if = "Vec::is_empty")]
    pub boxes: Vec<BoxReference>,
    #[serde(rename = "apid", skip_serializing_if = "is_zero")]
    pub app_id: u64,
    #[serde(rename = "arcv", skip_serializing_if = "Option::is_none")]
    pub asset_receiver: Option<Address>,
    #[serde(rename = "fee", skip_serializing_if = "is_zero")]
    pub fee: u64,
    #[serde(rename = "fv", skip_serializing_if = "is_zero")]
    pub first_valid: u64,
    #[serde(rename = "gen", skip_serializing_if = "String::is_empty")]
    pub genesis_id: String,
    #[serde(rename = "gh")]
    pub genesis_hash: Digest32,
    #[serde(rename = "grp", skip_serializing_if = "Option::is_none")]
    pub group: Option<Digest32>,
    #[serde(rename = "lv", skip_serializing_if = "is_zero")]
    pub last_valid: u64,
    #[serde(rename = "note", with = "serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<u8>,
    #[serde(rename = "rcv", skip_serializing_if = "Option::is_none")]
    pub receiver: Option<Address>,
    #[serde(rename = "snd")]
    pub sender: Address,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    #[serde(rename = "xaid", skip_serializing_if = "is_zero")]
    pub xfer_asset: u64,
}

impl Transaction {
    /// Canonical msgpack encoding.
    pub fn encode(&self) -> TxnResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| TxnError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> TxnResult<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| TxnError::Decode(e.to_string()))
    }

    /// Transaction id: `sha512_256("TX" || encoding)`.
    pub fn tx_id(&self) -> TxnResult<TxId> {
        let encoded = self.encode()?;
        Ok(TxId(sha512_256(&[TX_PREFIX, &encoded])))
    }

    /// Bytes a backend signs: `"TX" || encoding`.
    pub fn bytes_to_sign(&self) -> TxnResult<Vec<u8>> {
        let encoded = self.encode()?;
        let mut out = Vec::with_capacity(TX_PREFIX.len() + encoded.len());
        out.extend_from_slice(TX_PREFIX);
        out.extend_from_slice(&encoded);
        Ok(out)
    }

    /// Base64 of the canonical encoding (enclave transport form).
    pub fn to_base64(&self) -> TxnResult<String> {
        Ok(BASE64.encode(self.encode()?))
    }
}

/// Transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse the 52-character base32 form.
    pub fn parse(s: &str) -> TxnResult<Self> {
        let bytes = BASE32_NOPAD
            .decode(s.as_bytes())
            .map_err(|e| TxnError::Decode(format!("invalid transaction id: {e}")))?;
        let raw: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TxnError::Decode("transaction id must be 32 bytes".to_string()))?;
        Ok(Self(raw))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&BASE32_NOPAD.encode(&self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({self})")
    }
}

impl Serialize for TxId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Group id over an ordered list of transaction ids.
///
/// `sha512_256("TG" || msgpack({"txlist": [id, ...]}))`
pub fn compute_group_id(tx_ids: &[TxId]) -> TxnResult<Digest32> {
    #[derive(Serialize)]
    struct TxGroup<'a> {
        #[serde(rename = "txlist")]
        tx_list: Vec<&'a serde_bytes::Bytes>,
    }

    let group = TxGroup {
        tx_list: tx_ids
            .iter()
            .map(|id| serde_bytes::Bytes::new(id.as_bytes()))
            .collect(),
    };
    let encoded = rmp_serde::to_vec_named(&group).map_err(|e| TxnError::Encode(e.to_string()))?;
    Ok(Digest32(sha512_256(&[TX_GROUP_PREFIX, &encoded])))
}

// =============================================================================
// SignedTransaction
// =============================================================================

/// Signed transaction envelope (`{"sig": ..., "txn": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignedTransaction {
    #[serde(rename = "sig", with = "serde_bytes", skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
    #[serde(rename = "txn")]
    pub txn: Transaction,
}

impl SignedTransaction {
    pub fn new(txn: Transaction, signature: Vec<u8>) -> Self {
        Self { signature, txn }
    }

    pub fn encode(&self) -> TxnResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).map_err(|e| TxnError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> TxnResult<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| TxnError::Decode(e.to_string()))
    }

    /// Split a submitted group (concatenated signed transactions).
    pub fn decode_group(bytes: &[u8]) -> TxnResult<Vec<Self>> {
        let mut cursor = std::io::Cursor::new(bytes);
        let mut out = Vec::new();
        while (cursor.position() as usize) < bytes.len() {
            let stxn: Self =
                rmp_serde::from_read(&mut cursor).map_err(|e| TxnError::Decode(e.to_string()))?;
            out.push(stxn);
        }
        Ok(out)
    }
}
