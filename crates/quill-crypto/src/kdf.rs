//! Key derivation: Argon2id passphrase → user secret

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::KEY_SIZE;

/// A 256-bit user-wide secret derived from a passphrase via Argon2id.
///
/// Held only in memory and zeroized on drop.
#[derive(Clone)]
pub struct UserSecret {
    bytes: [u8; KEY_SIZE],
}

impl UserSecret {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for UserSecret {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for UserSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2id parameters for KDF
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Derive the 256-bit user secret from a passphrase using Argon2id.
///
/// The salt is the first 16 bytes of SHA-256(username), so every device
/// logging into the same account derives the same secret without storing
/// per-device salt state.
pub fn derive_user_secret(
    passphrase: &SecretString,
    username: &str,
    params: &KdfParams,
) -> CryptoResult<UserSecret> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::Kdf(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let salt = username_salt(username);

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), &salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2id KDF failed: {e}")))?;

    tracing::debug!(
        username,
        mem_cost_kib = params.mem_cost_kib,
        time_cost = params.time_cost,
        "derived user secret"
    );
    Ok(UserSecret::from_bytes(key))
}

fn username_salt(username: &str) -> [u8; 16] {
    let digest = Sha256::digest(username.as_bytes());
    let mut salt = [0u8; 16];
    salt.copy_from_slice(&digest[..16]);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    // Fast params for testing
    fn test_params() -> KdfParams {
        KdfParams {
            mem_cost_kib: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }

    #[test]
    fn test_kdf_deterministic() {
        let passphrase = SecretString::from("test-passphrase-123");

        let key1 = derive_user_secret(&passphrase, "user1", &test_params()).unwrap();
        let key2 = derive_user_secret(&passphrase, "user1", &test_params()).unwrap();

        assert_eq!(
            key1.as_bytes(),
            key2.as_bytes(),
            "KDF must be deterministic"
        );
    }

    #[test]
    fn test_kdf_different_passphrases() {
        let key1 =
            derive_user_secret(&SecretString::from("passphrase-a"), "user1", &test_params())
                .unwrap();
        let key2 =
            derive_user_secret(&SecretString::from("passphrase-b"), "user1", &test_params())
                .unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different passphrases must produce different secrets"
        );
    }

    #[test]
    fn test_kdf_different_usernames() {
        let passphrase = SecretString::from("same-passphrase");

        let key1 = derive_user_secret(&passphrase, "user1", &test_params()).unwrap();
        let key2 = derive_user_secret(&passphrase, "user2", &test_params()).unwrap();

        assert_ne!(
            key1.as_bytes(),
            key2.as_bytes(),
            "different usernames must produce different secrets"
        );
    }
}
