//! quill-crypto: client-side cryptography for the encrypted journal protocol
//!
//! Key hierarchy:
//! ```text
//! User Secret (256-bit, Argon2id from passphrase + username salt)
//!   ├── per-journal cipher key (HKDF-SHA256, info = "quill cipher" || journal uid)
//!   ├── per-journal hmac key   (HKDF-SHA256, info = "quill hmac"   || journal uid)
//!   └── userInfo keys          (same derivation, context = "userInfo")
//! ```
//!
//! Content encryption is XChaCha20-Poly1305; journal tags and entry chain
//! hashes are HMAC-SHA256 under the per-context hmac key. Journal sharing
//! wraps keys to a member's x25519 public key via a sealed box.

pub mod error;
pub mod kdf;
pub mod manager;
pub mod sealed;

pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_user_secret, KdfParams, UserSecret};
pub use manager::CryptoManager;
pub use sealed::{open, seal, KeyPair};

/// Size of the user secret and all derived symmetric keys (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of an HMAC-SHA256 tag, which is also the entry chain-hash size
pub const HMAC_SIZE: usize = 32;

/// Current protocol crypto version. Version 1 is a retired legacy suite.
pub const CURRENT_VERSION: u8 = 2;
