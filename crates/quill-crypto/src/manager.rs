//! Per-context symmetric crypto: HKDF subkeys, AEAD content encryption,
//! HMAC-SHA256 tags
//!
//! Encrypted payload format (binary):
//! ```text
//! [24 bytes: random nonce][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//!
//! The derivation context (a journal uid, or the literal `"userInfo"`) is fed
//! into HKDF as info, so the same user secret yields distinct keys per
//! journal and ciphertext cannot be substituted across journals.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::UserSecret;
use crate::{CURRENT_VERSION, HMAC_SIZE, KEY_SIZE, NONCE_SIZE, TAG_SIZE};

type HmacSha256 = Hmac<Sha256>;

const CIPHER_INFO: &[u8] = b"quill cipher";
const HMAC_INFO: &[u8] = b"quill hmac";

/// Symmetric crypto engine bound to one derivation context.
///
/// Construct one per journal (context = journal uid) or one for the user
/// info blob (context = `"userInfo"`). Derived keys are zeroized on drop.
pub struct CryptoManager {
    version: u8,
    cipher_key: [u8; KEY_SIZE],
    hmac_key: [u8; KEY_SIZE],
}

impl CryptoManager {
    /// Derive the per-context cipher and hmac keys from the user secret.
    ///
    /// Version 1 was a retired legacy suite and is rejected; only
    /// [`CURRENT_VERSION`] is accepted.
    pub fn new(version: u8, secret: &UserSecret, context: &str) -> CryptoResult<Self> {
        if version != CURRENT_VERSION {
            return Err(CryptoError::VersionNotSupported(version));
        }

        Ok(Self {
            version,
            cipher_key: hkdf_derive(secret.as_bytes(), CIPHER_INFO, context)?,
            hmac_key: hkdf_derive(secret.as_bytes(), HMAC_INFO, context)?,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Encrypt with XChaCha20-Poly1305 under the context cipher key.
    ///
    /// Returns `[24-byte nonce][ciphertext][16-byte tag]`.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Generic(format!("encryption failed: {e}")))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt a payload produced by [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, payload: &[u8]) -> CryptoResult<Vec<u8>> {
        if payload.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Generic(format!(
                "ciphertext too short: {} bytes (minimum {})",
                payload.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_SIZE);
        let nonce = XNonce::from_slice(nonce_bytes);
        let cipher = XChaCha20Poly1305::new((&self.cipher_key).into());

        cipher.decrypt(nonce, ciphertext).map_err(|_| {
            CryptoError::Generic("decryption failed: invalid key or corrupted data".into())
        })
    }

    /// HMAC-SHA256 over the concatenation of `parts`, keyed on the context
    /// hmac key.
    pub fn hmac(&self, parts: &[&[u8]]) -> [u8; HMAC_SIZE] {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hmac_key)
            .expect("HMAC accepts any key length");
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().into()
    }

    /// Constant-time verification of an HMAC tag over `parts`.
    pub fn verify_hmac(&self, parts: &[&[u8]], tag: &[u8]) -> CryptoResult<()> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.hmac_key)
            .expect("HMAC accepts any key length");
        for part in parts {
            mac.update(part);
        }
        mac.verify_slice(tag)
            .map_err(|_| CryptoError::Generic("HMAC verification failed".into()))
    }
}

impl Drop for CryptoManager {
    fn drop(&mut self) {
        self.cipher_key.zeroize();
        self.hmac_key.zeroize();
    }
}

impl std::fmt::Debug for CryptoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoManager")
            .field("version", &self.version)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

/// HKDF-SHA256 with info = domain label || context string.
fn hkdf_derive(ikm: &[u8; KEY_SIZE], label: &[u8], context: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    let hkdf = Hkdf::<Sha256>::new(None, ikm);

    let mut info = Vec::with_capacity(label.len() + context.len());
    info.extend_from_slice(label);
    info.extend_from_slice(context.as_bytes());

    let mut okm = [0u8; KEY_SIZE];
    hkdf.expand(&info, &mut okm)
        .map_err(|e| CryptoError::Kdf(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}
