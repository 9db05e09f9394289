use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash an API key for storage and lookup. Keys are never stored in plaintext.
pub fn hash_secret(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"coursepay-v1:");
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new caller API key (`cp_` + 64 hex chars).
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("cp_{}", hex::encode(bytes))
}
