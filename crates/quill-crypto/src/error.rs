use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption, decryption, or MAC computation failed at the primitive
    /// level (bad tag, truncated input, wrong key).
    #[error("crypto operation failed: {0}")]
    Generic(String),

    /// Key derivation failed (invalid Argon2id parameters, HKDF length).
    #[error("key derivation failed: {0}")]
    Kdf(String),

    /// Unknown or retired crypto suite version.
    #[error("crypto version {0} is not supported")]
    VersionNotSupported(u8),
}
