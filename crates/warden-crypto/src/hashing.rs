use sha2::{Digest, Sha256};

/// SHA-256 digest (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using SHA-256.
pub fn sha256(data: &[u8]) -> Hash {
    Sha256::digest(data).into()
}
