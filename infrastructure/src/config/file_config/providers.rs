//! Provider API configuration from TOML (`[providers]` section)
//!
//! ```toml
//! [providers.notion]
//! base_url = "https://api.notion.com/v1"
//! headers = { "Notion-Version" = "2022-06-28" }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider endpoints keyed by namespace
pub type FileProvidersConfig = HashMap<String, FileProviderEndpoint>;

/// API endpoint of one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderEndpoint {
    pub base_url: String,
    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
    /// HTTP-level timeout, independent of the breaker's call timeout
    pub request_timeout_seconds: u64,
}

impl Default for FileProviderEndpoint {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: HashMap::new(),
            request_timeout_seconds: 30,
        }
    }
}
