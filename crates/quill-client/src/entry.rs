//! Append-only chained entries within one journal.
//!
//! An entry's uid is not random: it is the chain hash
//! `HMAC-SHA256(hmac_key, prev_uid || plaintext)` rendered as lowercase hex,
//! with 64 zero chars standing in for the head of the chain. Hashing the
//! plaintext (not the ciphertext) keeps the chain reproducible across
//! re-encryptions and lets any key holder replay and verify the whole log
//! offline. It also makes idempotent retries detectable: the same payload
//! after the same predecessor always produces the same uid.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use quill_crypto::CryptoManager;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::serde_bytes;

/// The chain-head predecessor uid: 64 zero hex chars.
pub const ZERO_UID: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One append-only event, immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub uid: String,
    #[serde(with = "serde_bytes::b64")]
    pub content: Vec<u8>,
}

impl Entry {
    /// Build an entry from canonical payload bytes, chained after `prev`
    /// (`None` for the head of the journal).
    ///
    /// The chain hash is computed over the exact bytes supplied here; the
    /// library never re-serializes, so callers must pass the same canonical
    /// form they will use for verification.
    pub fn new(crypto: &CryptoManager, plaintext: &[u8], prev: Option<&Entry>) -> Result<Self> {
        let prev_uid = prev.map_or(ZERO_UID, |e| e.uid.as_str());
        Ok(Self {
            uid: chain_hash(crypto, prev_uid, plaintext),
            content: crypto.encrypt(plaintext)?,
        })
    }
}

/// `hex(HMAC(prev_uid || plaintext))` — the uid an entry must carry when it
/// follows `prev_uid`.
pub fn chain_hash(crypto: &CryptoManager, prev_uid: &str, plaintext: &[u8]) -> String {
    hex::encode(crypto.hmac(&[prev_uid.as_bytes(), plaintext]))
}

/// An entry whose chain position has been verified, with its payload.
#[derive(Debug, Clone)]
pub struct VerifiedEntry {
    pub entry: Entry,
    pub plaintext: Vec<u8>,
}

/// Walk a batch in server order, decrypting and checking each chain link.
///
/// `since` is the uid the batch claims to start after (`None` from the chain
/// head). The first mismatch aborts the walk; nothing is returned unless the
/// entire batch verifies.
pub fn verify_batch(
    crypto: &CryptoManager,
    since: Option<&str>,
    entries: Vec<Entry>,
) -> Result<Vec<VerifiedEntry>> {
    let mut prev = since.unwrap_or(ZERO_UID).to_string();
    let mut verified = Vec::with_capacity(entries.len());

    for entry in entries {
        let plaintext = crypto.decrypt(&entry.content)?;
        let expected = chain_hash(crypto, &prev, &plaintext);
        if expected != entry.uid {
            return Err(Error::Integrity(format!(
                "entry chain mismatch: expected {expected}, server returned {}",
                entry.uid
            )));
        }
        prev = entry.uid.clone();
        verified.push(VerifiedEntry { entry, plaintext });
    }

    Ok(verified)
}

/// Append-only operations on a single journal's entry log.
pub struct EntryManager {
    client: Client,
    journal_uid: String,
}

impl EntryManager {
    pub fn new(client: &Client, journal_uid: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            journal_uid: journal_uid.into(),
        }
    }

    /// `GET /api/v1/journals/{uid}/entries/?last=<since>&limit=<n>`.
    ///
    /// Returns the entries after `since` in insertion order, decrypted and
    /// chain-verified; any broken link fails the whole listing.
    pub async fn list(
        &self,
        crypto: &CryptoManager,
        since: Option<&str>,
        limit: u32,
    ) -> Result<Vec<VerifiedEntry>> {
        let mut url = self
            .client
            .url(&["api", "v1", "journals", &self.journal_uid, "entries"]);
        if let Some(since) = since {
            url.query_pairs_mut().append_pair("last", since);
        }
        if limit > 0 {
            url.query_pairs_mut().append_pair("limit", &limit.to_string());
        }

        let entries: Vec<Entry> = self.client.get_json(url).await?;
        let verified = verify_batch(crypto, since, entries)?;

        debug!(
            journal = %self.journal_uid,
            count = verified.len(),
            "listed and verified entries"
        );
        Ok(verified)
    }

    /// `POST /api/v1/journals/{uid}/entries/?last=<last>` — fast-forward
    /// append.
    ///
    /// `last` must name the server's current tail (`None` for an empty
    /// journal); if the tail moved, the server answers 409 and nothing is
    /// stored. Callers then refetch from their old tail and retry.
    pub async fn create(&self, entries: &[Entry], last: Option<&str>) -> Result<()> {
        let mut url = self
            .client
            .url(&["api", "v1", "journals", &self.journal_uid, "entries"]);
        if let Some(last) = last {
            url.query_pairs_mut().append_pair("last", last);
        }

        self.client.post_json(url, entries).await?;
        info!(
            journal = %self.journal_uid,
            count = entries.len(),
            "appended entries"
        );
        Ok(())
    }
}
