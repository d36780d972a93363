//! Agent token generation and hashing.
//!
//! Agents authenticate with an opaque token returned once at registration.
//! Only its SHA-256 digest is persisted.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a generated agent token (alphanumeric characters).
pub const AGENT_TOKEN_LENGTH: usize = 48;

/// The result of generating a new agent token.
pub struct GeneratedToken {
    /// The plaintext token (returned to the agent exactly once, never stored).
    pub plaintext: String,
    /// The SHA-256 hex digest of the plaintext (stored with the agent).
    pub hash: String,
}

/// Generate a new random agent token.
pub fn generate_agent_token() -> GeneratedToken {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(AGENT_TOKEN_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_token(&plaintext);

    GeneratedToken { plaintext, hash }
}

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Hash a plaintext token for storage or lookup.
pub fn hash_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

/// Compare a presented secret with the expected one.
///
/// Both sides are hashed first so the comparison length never depends on
/// the input, and the fold visits every byte.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
