use serde::{Deserialize, Serialize};

/// Client configuration (embeddable in a host's config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server base URL, e.g. `https://journal.example.com`
    pub base_url: String,
    /// TCP connect timeout in seconds (default: 30)
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".into(),
            connect_timeout_secs: 30,
            timeout_secs: 30,
        }
    }
}
