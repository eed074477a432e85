//! Connection store configuration from TOML (`[store]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw store configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// JSON file holding connection records
    pub connections_file: Option<PathBuf>,
}
