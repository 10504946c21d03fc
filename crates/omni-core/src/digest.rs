//! SHA-512/256 helpers used for ids, checksums and method selectors.

use sha2::{Digest, Sha512_256};

/// Hash the concatenation of `parts` with SHA-512/256.
pub fn sha512_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
