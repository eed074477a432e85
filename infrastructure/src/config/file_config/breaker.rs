//! Circuit breaker configuration from TOML (`[breaker]` section)
//!
//! ```toml
//! [breaker]
//! failure_threshold = 5
//! reset_timeout_seconds = 30
//! scope = "provider"
//!
//! [breaker.providers.github]
//! failure_threshold = 3
//! ```

use super::ConfigValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use toolgate_application::{BreakerParams, BreakerScope};

/// Raw breaker configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBreakerConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_seconds: u64,
    /// Per-call timeout; omit to disable
    pub call_timeout_seconds: Option<u64>,
    pub half_open_max_calls: u32,
    /// "provider" or "connection"
    pub scope: String,
    /// Per-provider overrides, merged over the fields above
    pub providers: HashMap<String, FileBreakerOverride>,
}

impl Default for FileBreakerConfig {
    fn default() -> Self {
        let params = BreakerParams::default();
        Self {
            failure_threshold: params.failure_threshold,
            success_threshold: params.success_threshold,
            reset_timeout_seconds: params.reset_timeout.as_secs(),
            call_timeout_seconds: params.call_timeout.map(|t| t.as_secs()),
            half_open_max_calls: params.half_open_max_calls,
            scope: "provider".to_string(),
            providers: HashMap::new(),
        }
    }
}

/// Raw per-provider breaker override
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBreakerOverride {
    pub failure_threshold: Option<u32>,
    pub success_threshold: Option<u32>,
    pub reset_timeout_seconds: Option<u64>,
    pub call_timeout_seconds: Option<u64>,
    pub half_open_max_calls: Option<u32>,
}

fn nonzero_u32(field: String, value: u32) -> Result<u32, ConfigValidationError> {
    if value == 0 {
        return Err(ConfigValidationError::ZeroValue { field });
    }
    Ok(value)
}

fn nonzero_secs(field: String, value: u64) -> Result<Duration, ConfigValidationError> {
    if value == 0 {
        return Err(ConfigValidationError::ZeroValue { field });
    }
    Ok(Duration::from_secs(value))
}

impl FileBreakerConfig {
    pub fn to_scope(&self) -> Result<BreakerScope, ConfigValidationError> {
        self.scope
            .parse()
            .map_err(|_| ConfigValidationError::InvalidEnumValue {
                field: "breaker.scope".to_string(),
                value: self.scope.clone(),
                valid_values: vec!["provider", "connection"],
            })
    }

    /// Default breaker parameters.
    pub fn to_params(&self) -> Result<BreakerParams, ConfigValidationError> {
        self.merged("breaker", &FileBreakerOverride::default())
    }

    /// Parameters for one `[breaker.providers.<name>]` table.
    pub fn to_override_params(&self, provider: &str) -> Result<Option<BreakerParams>, ConfigValidationError> {
        match self.providers.get(provider) {
            Some(over) => self
                .merged(&format!("breaker.providers.{provider}"), over)
                .map(Some),
            None => Ok(None),
        }
    }

    fn merged(&self, section: &str, over: &FileBreakerOverride) -> Result<BreakerParams, ConfigValidationError> {
        let call_timeout = match over.call_timeout_seconds.or(self.call_timeout_seconds) {
            Some(secs) => Some(nonzero_secs(format!("{section}.call_timeout_seconds"), secs)?),
            None => None,
        };
        Ok(BreakerParams {
            failure_threshold: nonzero_u32(
                format!("{section}.failure_threshold"),
                over.failure_threshold.unwrap_or(self.failure_threshold),
            )?,
            success_threshold: nonzero_u32(
                format!("{section}.success_threshold"),
                over.success_threshold.unwrap_or(self.success_threshold),
            )?,
            reset_timeout: nonzero_secs(
                format!("{section}.reset_timeout_seconds"),
                over.reset_timeout_seconds.unwrap_or(self.reset_timeout_seconds),
            )?,
            call_timeout,
            half_open_max_calls: nonzero_u32(
                format!("{section}.half_open_max_calls"),
                over.half_open_max_calls.unwrap_or(self.half_open_max_calls),
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::FileConfig;
    use super::*;

    #[test]
    fn test_override_merges_over_defaults() {
        let toml_str = r#"
[breaker]
failure_threshold = 4
reset_timeout_seconds = 10

[breaker.providers.github]
failure_threshold = 2
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let github = config.breaker.to_override_params("github").unwrap().unwrap();

        assert_eq!(github.failure_threshold, 2);
        assert_eq!(github.reset_timeout, Duration::from_secs(10));
        assert_eq!(github.success_threshold, 2);
        assert!(config.breaker.to_override_params("slack").unwrap().is_none());
    }

    #[test]
    fn test_zero_threshold_rejected_with_field_path() {
        let toml_str = r#"
[breaker.providers.notion]
success_threshold = 0
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let err = config.breaker.to_override_params("notion").unwrap_err();
        assert_eq!(
            err.to_string(),
            "breaker.providers.notion.success_threshold cannot be 0"
        );
    }

    #[test]
    fn test_unknown_scope_rejected() {
        let config: FileConfig = toml::from_str("[breaker]\nscope = \"tenant\"\n").unwrap();
        assert!(matches!(
            config.breaker.to_scope(),
            Err(ConfigValidationError::InvalidEnumValue { .. })
        ));
    }
}
