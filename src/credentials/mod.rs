use sha2::{Digest, Sha256};
use uuid::Uuid;

/// One-way credential handling. The stored value is always the hash;
/// plaintext exists only for the duration of the call.
pub trait CredentialHasher: Send + Sync {
    /// Hash a plaintext password into the opaque stored credential.
    fn hash(&self, plaintext: &str) -> String;

    /// Random plaintext used when the caller supplies no password.
    fn generate(&self) -> String;
}

/// Salted SHA-256 hasher, the stock scheme. Format: `sha256$<salt>$<hex>`.
pub struct Sha256Hasher;

impl CredentialHasher for Sha256Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let salt = Uuid::new_v4().simple().to_string();
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(plaintext.as_bytes());
        format!("sha256${}${:x}", salt, hasher.finalize())
    }

    fn generate(&self) -> String {
        // 16 hex chars of v4 randomness is plenty for a first-login password
        let raw = Uuid::new_v4().simple().to_string();
        raw[..16].to_string()
    }
}
