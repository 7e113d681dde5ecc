//! Journals: encrypted per-collection metadata envelopes, plus membership.
//!
//! A journal's `hmac` authenticates `uid || ciphertext` under the journal's
//! derived hmac key, so the server can neither alter the metadata nor swap
//! ciphertext between journals without detection.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use quill_crypto::CryptoManager;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::serde_bytes;

/// Encrypted journal descriptor as stored on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    pub uid: String,
    pub version: u8,
    #[serde(with = "serde_bytes::b64")]
    pub content: Vec<u8>,
    #[serde(with = "serde_bytes::hexstr")]
    pub hmac: Vec<u8>,
    /// Assigned by the server; present on listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, rename = "readOnly")]
    pub read_only: bool,
}

impl Journal {
    /// Generate a fresh 128-bit journal uid, rendered as lowercase hex.
    pub fn gen_uid() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Build a journal from canonical metadata bytes: encrypt, then
    /// authenticate `uid || ciphertext`.
    pub fn new(crypto: &CryptoManager, uid: &str, plaintext: &[u8]) -> Result<Self> {
        let content = crypto.encrypt(plaintext)?;
        let hmac = crypto.hmac(&[uid.as_bytes(), &content]).to_vec();
        Ok(Self {
            uid: uid.to_string(),
            version: crypto.version(),
            content,
            hmac,
            owner: None,
            read_only: false,
        })
    }

    /// Verify the stored tag against `uid || ciphertext`.
    pub fn verify(&self, crypto: &CryptoManager) -> Result<()> {
        crypto
            .verify_hmac(&[self.uid.as_bytes(), &self.content], &self.hmac)
            .map_err(|_| {
                Error::Integrity(format!("journal {} failed HMAC verification", self.uid))
            })
    }

    /// Verify, then decrypt the metadata payload.
    pub fn content(&self, crypto: &CryptoManager) -> Result<Vec<u8>> {
        self.verify(crypto)?;
        Ok(crypto.decrypt(&self.content)?)
    }

    /// Replace the ciphertext **without** recomputing the tag. The journal
    /// will fail [`verify`](Self::verify) until the tag is refreshed; use
    /// [`update_content`](Self::update_content) for the normal path.
    pub fn set_content(&mut self, crypto: &CryptoManager, plaintext: &[u8]) -> Result<()> {
        self.content = crypto.encrypt(plaintext)?;
        Ok(())
    }

    /// Re-encrypt the metadata and recompute the tag.
    pub fn update_content(&mut self, crypto: &CryptoManager, plaintext: &[u8]) -> Result<()> {
        self.content = crypto.encrypt(plaintext)?;
        self.hmac = crypto.hmac(&[self.uid.as_bytes(), &self.content]).to_vec();
        Ok(())
    }
}

/// A user granted access to a journal. `key` is the journal key material
/// sealed to the member's public key with the journal uid as AAD.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user: String,
    #[serde(with = "serde_bytes::b64")]
    pub key: Vec<u8>,
}

impl Member {
    pub fn new(user: impl Into<String>, key: Vec<u8>) -> Self {
        Self {
            user: user.into(),
            key,
        }
    }

    /// Seal `key_material` to `recipient_pubkey`, bound to `journal_uid`.
    pub fn wrap(
        user: impl Into<String>,
        journal_uid: &str,
        recipient_pubkey: &[u8; 32],
        key_material: &[u8],
    ) -> Result<Self> {
        let key = quill_crypto::seal(recipient_pubkey, key_material, journal_uid.as_bytes())?;
        Ok(Self {
            user: user.into(),
            key,
        })
    }
}

/// CRUD over the authenticated user's journals.
pub struct JournalManager {
    client: Client,
}

impl JournalManager {
    pub fn new(client: &Client) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// `GET /api/v1/journals/`. Every returned journal is verified with a
    /// per-uid crypto manager derived from `secret` before anything is
    /// returned; a single bad tag fails the whole listing.
    pub async fn list(&self, secret: &quill_crypto::UserSecret) -> Result<Vec<Journal>> {
        let url = self.client.url(&["api", "v1", "journals"]);
        let journals: Vec<Journal> = self.client.get_json(url).await?;

        for journal in &journals {
            let crypto = CryptoManager::new(journal.version, secret, &journal.uid)?;
            journal.verify(&crypto)?;
        }

        debug!(count = journals.len(), "listed journals");
        Ok(journals)
    }

    /// `POST /api/v1/journals/`. A uid clash is a client error from the
    /// server; retry with a fresh uid.
    pub async fn create(&self, journal: &Journal) -> Result<()> {
        let url = self.client.url(&["api", "v1", "journals"]);
        self.client.post_json(url, journal).await?;
        info!(uid = %journal.uid, "created journal");
        Ok(())
    }

    /// `PUT /api/v1/journals/{uid}/`. The uid is immutable; only ciphertext
    /// and tag are rewritten.
    pub async fn update(&self, journal: &Journal) -> Result<()> {
        let url = self.client.url(&["api", "v1", "journals", &journal.uid]);
        self.client.put_json(url, journal).await?;
        info!(uid = %journal.uid, "updated journal");
        Ok(())
    }

    /// `DELETE /api/v1/journals/{uid}/`. A 404 is treated as success so the
    /// call is idempotent from the caller's viewpoint.
    pub async fn delete(&self, journal: &Journal) -> Result<()> {
        let url = self.client.url(&["api", "v1", "journals", &journal.uid]);
        match self.client.delete(url).await {
            Ok(_) => {}
            Err(Error::Http { status: 404, .. }) => {
                debug!(uid = %journal.uid, "journal already deleted");
            }
            Err(e) => return Err(e),
        }
        info!(uid = %journal.uid, "deleted journal");
        Ok(())
    }

    /// `GET /api/v1/journals/{uid}/members/`.
    pub async fn list_members(&self, journal: &Journal) -> Result<Vec<Member>> {
        let url = self
            .client
            .url(&["api", "v1", "journals", &journal.uid, "members"]);
        self.client.get_json(url).await
    }

    /// `POST /api/v1/journals/{uid}/members/`. The server rejects the owner
    /// inviting themselves.
    pub async fn add_member(&self, journal: &Journal, member: &Member) -> Result<()> {
        let url = self
            .client
            .url(&["api", "v1", "journals", &journal.uid, "members"]);
        self.client.post_json(url, member).await?;
        info!(uid = %journal.uid, user = %member.user, "added member");
        Ok(())
    }

    /// `DELETE /api/v1/journals/{uid}/members/{user}/`.
    pub async fn delete_member(&self, journal: &Journal, member: &Member) -> Result<()> {
        let url = self
            .client
            .url(&["api", "v1", "journals", &journal.uid, "members", &member.user]);
        self.client.delete(url).await?;
        info!(uid = %journal.uid, user = %member.user, "removed member");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_crypto::{CryptoManager, KeyPair, UserSecret, CURRENT_VERSION};

    fn test_secret() -> UserSecret {
        UserSecret::from_bytes([7u8; 32])
    }

    fn test_crypto(uid: &str) -> CryptoManager {
        CryptoManager::new(CURRENT_VERSION, &test_secret(), uid).unwrap()
    }

    #[test]
    fn test_gen_uid_format() {
        let uid = Journal::gen_uid();
        assert_eq!(uid.len(), 32);
        assert!(uid.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(uid, Journal::gen_uid());
    }

    #[test]
    fn test_journal_roundtrip() {
        let uid = Journal::gen_uid();
        let crypto = test_crypto(&uid);
        let metadata = br#"{"displayName":"Test","type":"ADDRESS_BOOK"}"#;

        let journal = Journal::new(&crypto, &uid, metadata).unwrap();
        journal.verify(&crypto).unwrap();
        assert_eq!(journal.content(&crypto).unwrap(), metadata);
        assert_eq!(journal.version, CURRENT_VERSION);
    }

    #[test]
    fn test_stale_hmac_detected() {
        let uid = Journal::gen_uid();
        let crypto = test_crypto(&uid);

        let mut journal = Journal::new(&crypto, &uid, b"original").unwrap();
        // set_content leaves the old tag in place
        journal.set_content(&crypto, b"tampered").unwrap();

        assert!(matches!(journal.verify(&crypto), Err(Error::Integrity(_))));
        assert!(journal.content(&crypto).is_err());
    }

    #[test]
    fn test_update_content_refreshes_hmac() {
        let uid = Journal::gen_uid();
        let crypto = test_crypto(&uid);

        let mut journal = Journal::new(&crypto, &uid, b"original").unwrap();
        journal.update_content(&crypto, b"replacement").unwrap();

        journal.verify(&crypto).unwrap();
        assert_eq!(journal.content(&crypto).unwrap(), b"replacement");
    }

    #[test]
    fn test_cross_journal_substitution_detected() {
        // Ciphertext moved from one journal to another must fail the tag
        let uid_a = Journal::gen_uid();
        let uid_b = Journal::gen_uid();
        let journal_a = Journal::new(&test_crypto(&uid_a), &uid_a, b"metadata").unwrap();

        let mut forged = journal_a.clone();
        forged.uid = uid_b.clone();

        assert!(forged.verify(&test_crypto(&uid_b)).is_err());
    }

    #[test]
    fn test_wire_format() {
        let uid = Journal::gen_uid();
        let crypto = test_crypto(&uid);
        let journal = Journal::new(&crypto, &uid, b"metadata").unwrap();

        let json = serde_json::to_value(&journal).unwrap();
        assert_eq!(json["uid"], uid);
        assert_eq!(json["hmac"], hex::encode(&journal.hmac));
        // owner is server-assigned and omitted on upload
        assert!(json.get("owner").is_none());

        let back: Journal = serde_json::from_value(json).unwrap();
        assert_eq!(back.content, journal.content);
        back.verify(&crypto).unwrap();
    }

    #[test]
    fn test_member_wrap_roundtrip() {
        let uid = Journal::gen_uid();
        let recipient = KeyPair::generate();
        let key_material = [9u8; 32];

        let member =
            Member::wrap("colleague", &uid, &recipient.public_bytes(), &key_material).unwrap();

        let opened = quill_crypto::open(&recipient, &member.key, uid.as_bytes()).unwrap();
        assert_eq!(opened, key_material);

        // Replaying the wrapped key onto another journal fails
        assert!(quill_crypto::open(&recipient, &member.key, b"other-journal").is_err());
    }
}
