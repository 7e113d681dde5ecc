//! Per-user encrypted blob carrying the sharing key pair.
//!
//! The public key travels in clear so other users can wrap journal keys to
//! it; the private half is encrypted under the user secret (context
//! `"userInfo"`, key-distinct from every journal). The tag binds ciphertext
//! and public key together so the server cannot swap in a key pair of its
//! own choosing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use quill_crypto::{CryptoManager, KeyPair};

use crate::client::Client;
use crate::error::{Error, Result};
use crate::serde_bytes;

/// Derivation context for user-info crypto managers.
pub const USER_INFO_CONTEXT: &str = "userInfo";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub owner: String,
    pub version: u8,
    #[serde(with = "serde_bytes::b64")]
    pub pubkey: Vec<u8>,
    #[serde(with = "serde_bytes::b64")]
    pub content: Vec<u8>,
    #[serde(with = "serde_bytes::hexstr")]
    pub hmac: Vec<u8>,
}

impl UserInfo {
    /// Generate a fresh key pair for `owner`, encrypting the private half.
    ///
    /// `crypto` must be constructed with [`USER_INFO_CONTEXT`].
    pub fn generate(crypto: &CryptoManager, owner: impl Into<String>) -> Result<Self> {
        let keypair = KeyPair::generate();
        let pubkey = keypair.public_bytes().to_vec();
        let content = crypto.encrypt(&keypair.private_bytes())?;
        let hmac = crypto.hmac(&[&content, &pubkey]).to_vec();

        Ok(Self {
            owner: owner.into(),
            version: crypto.version(),
            pubkey,
            content,
            hmac,
        })
    }

    /// Verify the tag over `ciphertext || pubkey`.
    pub fn verify(&self, crypto: &CryptoManager) -> Result<()> {
        crypto
            .verify_hmac(&[&self.content, &self.pubkey], &self.hmac)
            .map_err(|_| {
                Error::Integrity(format!(
                    "user info for {} failed HMAC verification",
                    self.owner
                ))
            })
    }

    /// Verify, then decrypt the private payload.
    pub fn content(&self, crypto: &CryptoManager) -> Result<Vec<u8>> {
        self.verify(crypto)?;
        Ok(crypto.decrypt(&self.content)?)
    }

    /// Replace the private payload, re-encrypting and re-tagging.
    pub fn set_content(&mut self, crypto: &CryptoManager, plaintext: &[u8]) -> Result<()> {
        self.content = crypto.encrypt(plaintext)?;
        self.hmac = crypto.hmac(&[&self.content, &self.pubkey]).to_vec();
        Ok(())
    }

    /// Decrypt the stored private key and rebuild the sharing key pair.
    pub fn keypair(&self, crypto: &CryptoManager) -> Result<KeyPair> {
        let private = self.content(crypto)?;
        let bytes: [u8; 32] = private.as_slice().try_into().map_err(|_| {
            Error::Integrity(format!(
                "user info for {} holds a malformed private key",
                self.owner
            ))
        })?;
        Ok(KeyPair::from_private_bytes(bytes))
    }
}

/// CRUD over the single per-user info blob.
pub struct UserInfoManager {
    client: Client,
}

impl UserInfoManager {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// `GET /api/v1/user/{owner}/`. Returns `None` on 404; otherwise the
    /// blob is HMAC-verified before it is returned.
    pub async fn get(&self, crypto: &CryptoManager, owner: &str) -> Result<Option<UserInfo>> {
        let url = self.client.url(&["api", "v1", "user", owner]);
        let Some(user_info) = self.client.get_json_optional::<UserInfo>(url).await? else {
            debug!(owner, "no user info on server");
            return Ok(None);
        };

        user_info.verify(crypto)?;
        Ok(Some(user_info))
    }

    /// `POST /api/v1/user/`.
    pub async fn create(&self, user_info: &UserInfo) -> Result<()> {
        let url = self.client.url(&["api", "v1", "user"]);
        self.client.post_json(url, user_info).await?;
        info!(owner = %user_info.owner, "created user info");
        Ok(())
    }

    /// `PUT /api/v1/user/{owner}/`.
    pub async fn update(&self, user_info: &UserInfo) -> Result<()> {
        let url = self.client.url(&["api", "v1", "user", &user_info.owner]);
        self.client.put_json(url, user_info).await?;
        info!(owner = %user_info.owner, "updated user info");
        Ok(())
    }

    /// `DELETE /api/v1/user/{owner}/`.
    pub async fn delete(&self, user_info: &UserInfo) -> Result<()> {
        let url = self.client.url(&["api", "v1", "user", &user_info.owner]);
        self.client.delete(url).await?;
        info!(owner = %user_info.owner, "deleted user info");
        Ok(())
    }
}
