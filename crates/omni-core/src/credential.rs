//! Explicit signing context for an acting address.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;

/// Kind of credential-holding backend an address is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Wallet-style backend: signs a batch of transactions at given indexes.
    Standard,
    /// Enclave backend: signs pre-serialized items, null per refused item.
    Enclave,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Enclave => write!(f, "enclave"),
        }
    }
}

/// Associates an acting address with exactly one signing backend.
///
/// Resolved once, before composition, and carried on every group member the
/// address must sign. Never read from ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedCredentialContext {
    pub address: Address,
    pub backend: BackendKind,
}

impl SignedCredentialContext {
    pub fn new(address: Address, backend: BackendKind) -> Self {
        Self { address, backend }
    }

    pub fn standard(address: Address) -> Self {
        Self::new(address, BackendKind::Standard)
    }

    pub fn enclave(address: Address) -> Self {
        Self::new(address, BackendKind::Enclave)
    }
}
