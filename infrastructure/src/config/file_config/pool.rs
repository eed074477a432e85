//! Client pool configuration from TOML (`[pool]` section)

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_application::PoolParams;

/// Raw pool configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePoolConfig {
    /// Seconds an unreferenced client may stay pooled
    pub idle_timeout_seconds: u64,
    /// Seconds between background eviction sweeps
    pub reap_interval_seconds: u64,
}

impl Default for FilePoolConfig {
    fn default() -> Self {
        let params = PoolParams::default();
        Self {
            idle_timeout_seconds: params.idle_timeout.as_secs(),
            reap_interval_seconds: params.reap_interval.as_secs(),
        }
    }
}

impl FilePoolConfig {
    pub fn to_params(&self) -> Result<PoolParams, ConfigValidationError> {
        if self.idle_timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroValue {
                field: "pool.idle_timeout_seconds".to_string(),
            });
        }
        if self.reap_interval_seconds == 0 {
            return Err(ConfigValidationError::ZeroValue {
                field: "pool.reap_interval_seconds".to_string(),
            });
        }
        Ok(PoolParams {
            idle_timeout: Duration::from_secs(self.idle_timeout_seconds),
            reap_interval: Duration::from_secs(self.reap_interval_seconds),
        })
    }
}
