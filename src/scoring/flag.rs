//! Flag validation.
//!
//! Flags are stored as lower-case hex SHA-256 digests. A submission is hashed
//! the same way and compared byte-for-byte; no trimming or case folding is
//! applied to the submitted text.

use sha2::{Digest, Sha256};

/// Hashes a flag the way it is stored in the catalogue.
pub fn hash_flag(flag: &str) -> String {
    hex::encode(Sha256::digest(flag.as_bytes()))
}

/// Returns `true` when `submitted` hashes to `expected_hash`.
///
/// An empty submission is rejected without hashing.
pub fn validate(submitted: &str, expected_hash: &str) -> bool {
    if submitted.is_empty() {
        return false;
    }
    hash_flag(submitted).as_bytes() == expected_hash.as_bytes()
}
