use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Credentials rejected by the auth endpoint.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server answered with a non-success status.
    #[error("HTTP {status} on {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
        /// 5xx responses are retryable by the host; 4xx are not.
        retryable: bool,
    },

    /// A verified invariant was violated: bad journal HMAC, entry chain
    /// mismatch, or a tampered user-info blob. Never recovered internally.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Crypto(#[from] quill_crypto::CryptoError),

    /// Network-level failure (connect, timeout, malformed response body).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the host may sensibly retry the failed operation as-is.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http { retryable, .. } => *retryable,
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Whether this is an append conflict (the server's tail moved).
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Http { status: 409, .. })
    }
}
