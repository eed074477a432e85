//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! [`FileConfig::to_isolation_params`] validates them and converts them into
//! the application's [`IsolationParams`].

mod breaker;
mod oauth;
mod pool;
mod providers;
mod store;
mod token;

pub use breaker::{FileBreakerConfig, FileBreakerOverride};
pub use oauth::{FileOAuthConfig, FileOAuthProviderConfig};
pub use pool::FilePoolConfig;
pub use providers::{FileProviderEndpoint, FileProvidersConfig};
pub use store::FileStoreConfig;
pub use token::FileTokenConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolgate_application::IsolationParams;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field} cannot be 0")]
    ZeroValue { field: String },

    #[error("{field}: unknown value '{value}' (expected one of: {})", valid_values.join(", "))]
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<&'static str>,
    },

    #[error("oauth.providers.{provider}.token_url cannot be empty")]
    EmptyTokenUrl { provider: String },

    #[error("providers.{provider}.base_url cannot be empty")]
    EmptyBaseUrl { provider: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Circuit breaker thresholds and per-provider overrides
    pub breaker: FileBreakerConfig,
    /// Client pool eviction
    pub pool: FilePoolConfig,
    /// Token refresh behaviour
    pub token: FileTokenConfig,
    /// OAuth token endpoints
    pub oauth: FileOAuthConfig,
    /// Provider API endpoints
    pub providers: FileProvidersConfig,
    /// Connection store location
    pub store: FileStoreConfig,
}

impl FileConfig {
    /// Validate the whole configuration and build [`IsolationParams`].
    ///
    /// Stops at the first invalid field.
    pub fn to_isolation_params(&self) -> Result<IsolationParams, ConfigValidationError> {
        let mut params = IsolationParams::default()
            .with_breaker(self.breaker.to_params()?)
            .with_breaker_scope(self.breaker.to_scope()?)
            .with_pool(self.pool.to_params()?)
            .with_token(self.token.to_params());

        let mut providers: Vec<&String> = self.breaker.providers.keys().collect();
        providers.sort();
        for provider in providers {
            if let Some(over) = self.breaker.to_override_params(provider)? {
                params = params.with_breaker_override(provider.as_str(), over);
            }
        }
        Ok(params)
    }

    /// Validate every section, including the ones [`Self::to_isolation_params`] does not read.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.to_isolation_params()?;
        if self.oauth.request_timeout_seconds == 0 {
            return Err(ConfigValidationError::ZeroValue {
                field: "oauth.request_timeout_seconds".to_string(),
            });
        }
        if let Some((provider, _)) = self
            .oauth
            .providers
            .iter()
            .find(|(_, p)| p.token_url.trim().is_empty())
        {
            return Err(ConfigValidationError::EmptyTokenUrl {
                provider: provider.clone(),
            });
        }
        for (provider, endpoint) in &self.providers {
            if endpoint.base_url.trim().is_empty() {
                return Err(ConfigValidationError::EmptyBaseUrl {
                    provider: provider.clone(),
                });
            }
            if endpoint.request_timeout_seconds == 0 {
                return Err(ConfigValidationError::ZeroValue {
                    field: format!("providers.{provider}.request_timeout_seconds"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use toolgate_application::BreakerScope;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[breaker]
failure_threshold = 3
success_threshold = 1
reset_timeout_seconds = 15
call_timeout_seconds = 20
half_open_max_calls = 2
scope = "connection"

[breaker.providers.Linear]
reset_timeout_seconds = 60

[pool]
idle_timeout_seconds = 120
reap_interval_seconds = 30

[token]
safety_skew_seconds = 90

[oauth.providers.notion]
token_url = "https://api.notion.com/v1/oauth/token"
client_id = "abc"
client_secret = "shh"

[store]
connections_file = "connections.json"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        let params = config.to_isolation_params().unwrap();
        assert_eq!(params.breaker.failure_threshold, 3);
        assert_eq!(params.breaker.call_timeout, Some(Duration::from_secs(20)));
        assert_eq!(params.breaker.half_open_max_calls, 2);
        assert_eq!(params.breaker_scope, BreakerScope::Connection);
        assert_eq!(params.breaker_for("linear").reset_timeout, Duration::from_secs(60));
        assert_eq!(params.breaker_for("linear").failure_threshold, 3);
        assert_eq!(params.pool.idle_timeout, Duration::from_secs(120));
        assert_eq!(params.token.safety_skew, Duration::from_secs(90));
        assert_eq!(config.providers["notion"].request_timeout_seconds, 15);
        assert_eq!(
            config.providers["notion"].headers["Notion-Version"],
            "2022-06-28"
        );
        assert_eq!(
            config.store.connections_file.as_deref(),
            Some(std::path::Path::new("connections.json"))
        );
    }

    #[test]
    fn test_default_config_matches_application_defaults() {
        let config = FileConfig::default();
        assert_eq!(config.to_isolation_params().unwrap(), IsolationParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[pool]\nidle_timeout_seconds = 10\n").unwrap();
        let params = config.to_isolation_params().unwrap();
        assert_eq!(params.pool.idle_timeout, Duration::from_secs(10));
        assert_eq!(params.pool.reap_interval, Duration::from_secs(60));
        assert_eq!(params.breaker.failure_threshold, 5);
    }

    #[test]
    fn test_zero_values_rejected() {
        let config: FileConfig = toml::from_str("[breaker]\nreset_timeout_seconds = 0\n").unwrap();
        assert_eq!(
            config.to_isolation_params().unwrap_err(),
            ConfigValidationError::ZeroValue {
                field: "breaker.reset_timeout_seconds".to_string()
            }
        );

        let config: FileConfig = toml::from_str("[pool]\nreap_interval_seconds = 0\n").unwrap();
        assert!(config.to_isolation_params().is_err());
    }

    #[test]
    fn test_empty_token_url_rejected() {
        let config: FileConfig =
            toml::from_str("[oauth.providers.github]\nclient_id = \"x\"\n").unwrap();
        assert_eq!(
            config.validate().unwrap_err().to_string(),
            "oauth.providers.github.token_url cannot be empty"
        );
    }
}
