//! Suggested transaction parameters fetched from the node before composition.

use serde::{Deserialize, Serialize};

use crate::transaction::Digest32;

/// Network minimum fee per transaction (micro-units).
pub const DEFAULT_MIN_FEE: u64 = 1000;

/// Parameters every composed member is stamped with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParams {
    /// Minimum flat fee per transaction.
    pub min_fee: u64,
    /// Latest round known to the node; becomes first-valid.
    pub last_round: u64,
    pub genesis_id: String,
    pub genesis_hash: Digest32,
}

impl SuggestedParams {
    /// Flat fee for a member that also pays for `inner` inner transactions.
    pub fn pooled_fee(&self, inner: u64) -> u64 {
        self.min_fee.max(DEFAULT_MIN_FEE).saturating_mul(inner + 1)
    }
}
