//! Sealed box: wrap journal keys to a member's x25519 public key
//!
//! Sealed payload format (binary):
//! ```text
//! [32 bytes: ephemeral x25519 public key][24 bytes: nonce][ciphertext][16 bytes: tag]
//! ```
//!
//! The shared secret from an ephemeral ECDH is expanded through HKDF-SHA256
//! (info bound to both public keys) into an XChaCha20-Poly1305 key. Callers
//! pass the journal uid as AAD so a wrapped key cannot be replayed onto a
//! different journal.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::{KEY_SIZE, NONCE_SIZE, TAG_SIZE};

const SEAL_INFO: &[u8] = b"quill sealed box";
const PUBKEY_SIZE: usize = 32;

/// An x25519 key pair used for receiving wrapped journal keys.
///
/// The private half is zeroized when the pair is dropped
/// (`StaticSecret` zeroizes itself).
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh random key pair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Reconstruct a key pair from its stored private half.
    pub fn from_private_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_bytes(&self) -> [u8; PUBKEY_SIZE] {
        self.public.to_bytes()
    }

    pub fn private_bytes(&self) -> [u8; KEY_SIZE] {
        self.secret.to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt `plaintext` to `recipient`'s public key, binding `aad`
/// (the journal uid) as associated data.
pub fn seal(recipient: &[u8; PUBKEY_SIZE], plaintext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
    let recipient_pk = PublicKey::from(*recipient);

    let ephemeral = StaticSecret::random_from_rng(OsRng);
    let ephemeral_pk = PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(&recipient_pk);
    let key = seal_key(shared.as_bytes(), ephemeral_pk.as_bytes(), recipient)?;
    let cipher = XChaCha20Poly1305::new((&key).into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::Generic(format!("sealing failed: {e}")))?;

    let mut result = Vec::with_capacity(PUBKEY_SIZE + NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(ephemeral_pk.as_bytes());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt a payload produced by [`seal`] using the recipient's key pair.
/// The same `aad` must be supplied or authentication fails.
pub fn open(keypair: &KeyPair, sealed: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
    if sealed.len() < PUBKEY_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Generic(format!(
            "sealed payload too short: {} bytes (minimum {})",
            sealed.len(),
            PUBKEY_SIZE + NONCE_SIZE + TAG_SIZE
        )));
    }

    let (ephemeral_bytes, rest) = sealed.split_at(PUBKEY_SIZE);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut ephemeral_pk = [0u8; PUBKEY_SIZE];
    ephemeral_pk.copy_from_slice(ephemeral_bytes);

    let shared = keypair.secret.diffie_hellman(&PublicKey::from(ephemeral_pk));
    let key = seal_key(shared.as_bytes(), &ephemeral_pk, &keypair.public_bytes())?;
    let cipher = XChaCha20Poly1305::new((&key).into());
    let nonce = XNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::Generic("unsealing failed: wrong key or corrupted data".into()))
}

/// HKDF the ECDH shared secret into the AEAD key, binding both public keys.
fn seal_key(
    shared: &[u8; KEY_SIZE],
    ephemeral_pk: &[u8; PUBKEY_SIZE],
    recipient_pk: &[u8; PUBKEY_SIZE],
) -> CryptoResult<[u8; KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, shared);

    let mut info = Vec::with_capacity(SEAL_INFO.len() + 2 * PUBKEY_SIZE);
    info.extend_from_slice(SEAL_INFO);
    info.extend_from_slice(ephemeral_pk);
    info.extend_from_slice(recipient_pk);

    let mut okm = [0u8; KEY_SIZE];
    let result = hkdf
        .expand(&info, &mut okm)
        .map_err(|e| CryptoError::Kdf(format!("HKDF expand failed: {e}")));
    info.zeroize();
    result?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = KeyPair::generate();
        let journal_uid = b"5d2c2a3ad0df1a0c0b4b4e5d9d5cbf4f";

        let sealed = seal(&recipient.public_bytes(), b"journal key material", journal_uid).unwrap();
        let opened = open(&recipient, &sealed, journal_uid).unwrap();

        assert_eq!(opened, b"journal key material");
    }

    #[test]
    fn test_open_wrong_keypair() {
        let recipient = KeyPair::generate();
        let other = KeyPair::generate();

        let sealed = seal(&recipient.public_bytes(), b"secret", b"uid").unwrap();
        assert!(open(&other, &sealed, b"uid").is_err());
    }

    #[test]
    fn test_open_wrong_aad() {
        let recipient = KeyPair::generate();

        let sealed = seal(&recipient.public_bytes(), b"secret", b"journal-a").unwrap();
        assert!(
            open(&recipient, &sealed, b"journal-b").is_err(),
            "wrapped key must not open under a different journal uid"
        );
    }

    #[test]
    fn test_keypair_private_roundtrip() {
        let pair = KeyPair::generate();
        let restored = KeyPair::from_private_bytes(pair.private_bytes());

        assert_eq!(pair.public_bytes(), restored.public_bytes());

        let sealed = seal(&pair.public_bytes(), b"secret", b"uid").unwrap();
        assert_eq!(open(&restored, &sealed, b"uid").unwrap(), b"secret");
    }

    #[test]
    fn test_sealed_size() {
        let recipient = KeyPair::generate();
        let sealed = seal(&recipient.public_bytes(), &[0u8; 32], b"uid").unwrap();

        // ephemeral pk (32) + nonce (24) + key (32) + tag (16)
        assert_eq!(sealed.len(), 32 + NONCE_SIZE + 32 + TAG_SIZE);
    }
}
