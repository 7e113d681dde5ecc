//! quill-client: client for the encrypted journal protocol
//!
//! A journal is a server-side collection whose metadata and events are opaque
//! to the server. Each journal is an append-only log of entries chained by
//! HMAC-SHA256 over `(previous uid || plaintext)`, so reordering, dropping,
//! or inserting events is detectable by any client holding the journal key.
//!
//! Managers are plain async objects sharing one [`Client`] (and thus one
//! connection pool). The library performs no retries and spawns no background
//! tasks; conflict errors on append (HTTP 409) are surfaced for the caller to
//! refetch and retry.

pub mod client;
pub mod config;
pub mod entry;
pub mod error;
pub mod journal;
pub mod user_info;

mod serde_bytes;

pub use client::{Authenticator, Client};
pub use config::ClientConfig;
pub use entry::{verify_batch, Entry, EntryManager, VerifiedEntry, ZERO_UID};
pub use error::{Error, Result};
pub use journal::{Journal, JournalManager, Member};
pub use user_info::{UserInfo, UserInfoManager, USER_INFO_CONTEXT};
