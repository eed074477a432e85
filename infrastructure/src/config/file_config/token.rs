//! Token refresh configuration from TOML (`[token]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_application::TokenParams;

/// Raw token configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTokenConfig {
    /// Refresh this many seconds before nominal expiry (0 = refresh only once expired)
    pub safety_skew_seconds: u64,
    /// Serialize concurrent refreshes of the same connection
    pub single_flight: bool,
}

impl Default for FileTokenConfig {
    fn default() -> Self {
        let params = TokenParams::default();
        Self {
            safety_skew_seconds: params.safety_skew.as_secs(),
            single_flight: params.single_flight,
        }
    }
}

impl FileTokenConfig {
    pub fn to_params(&self) -> TokenParams {
        TokenParams {
            safety_skew: Duration::from_secs(self.safety_skew_seconds),
            single_flight: self.single_flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_deserialize() {
        let toml_str = r#"
[token]
safety_skew_seconds = 120
single_flight = true
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let params = config.token.to_params();
        assert_eq!(params.safety_skew, Duration::from_secs(120));
        assert!(params.single_flight);
    }
}
