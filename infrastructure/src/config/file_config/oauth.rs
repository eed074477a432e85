//! OAuth token endpoint configuration from TOML (`[oauth]` section)
//!
//! ```toml
//! [oauth]
//! request_timeout_seconds = 10
//!
//! [oauth.providers.notion]
//! token_url = "https://api.notion.com/v1/oauth/token"
//! client_id = "..."
//! client_secret = "..."
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Raw OAuth configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOAuthConfig {
    /// Timeout for token endpoint requests
    pub request_timeout_seconds: u64,
    /// Token endpoints keyed by provider namespace
    pub providers: HashMap<String, FileOAuthProviderConfig>,
}

impl Default for FileOAuthConfig {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 10,
            providers: HashMap::new(),
        }
    }
}

/// Token endpoint of one provider
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOAuthProviderConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for FileOAuthProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileOAuthProviderConfig")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
