//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order
const PROJECT_CONFIG_FILES: [&str; 2] = ["toolgate.toml", ".toolgate.toml"];

/// Prefix of environment overrides (`TOOLGATE_BREAKER__FAILURE_THRESHOLD=3`)
pub const ENV_PREFIX: &str = "TOOLGATE_";

/// Where one configuration layer comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub label: &'static str,
    pub path: Option<PathBuf>,
    pub found: bool,
}

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `TOOLGATE_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./toolgate.toml` or `./.toolgate.toml`
    /// 4. XDG config: `$XDG_CONFIG_HOME/toolgate/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }

    fn figment(config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(&global_path));
            }
        }

        if let Some(path) = Self::project_config_path() {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// Get the global config file path
    ///
    /// Returns XDG_CONFIG_HOME/toolgate/config.toml if set,
    /// otherwise the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("toolgate").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Configuration sources in priority order, highest first
    pub fn config_sources(config_path: Option<&Path>) -> Vec<ConfigSource> {
        let mut sources = Vec::new();

        if let Some(path) = config_path {
            sources.push(ConfigSource {
                label: "Explicit",
                path: Some(path.to_path_buf()),
                found: path.exists(),
            });
        }

        let project = Self::project_config_path();
        sources.push(ConfigSource {
            label: "Project",
            found: project.is_some(),
            path: project.or_else(|| Some(PathBuf::from(PROJECT_CONFIG_FILES[0]))),
        });

        let global = Self::global_config_path();
        sources.push(ConfigSource {
            label: "Global",
            found: global.as_ref().is_some_and(|p| p.exists()),
            path: global,
        });

        sources.push(ConfigSource {
            label: "Default",
            path: None,
            found: true,
        });
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config.breaker.failure_threshold, 5);
        assert!(config.oauth.providers.is_empty());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("toolgate"));
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[breaker]\nfailure_threshold = 9\n\n[breaker.providers.notion]\nhalf_open_max_calls = 3\n"
        )
        .unwrap();

        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.breaker.failure_threshold, 9);
        assert_eq!(config.breaker.success_threshold, 2);
        assert_eq!(
            config.breaker.providers["notion"].half_open_max_calls,
            Some(3)
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[breaker]\nfailure_threshold = \"many\"").unwrap();
        assert!(ConfigLoader::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_config_sources_lists_explicit_first() {
        let sources = ConfigLoader::config_sources(Some(Path::new("/nonexistent/toolgate.toml")));
        assert_eq!(sources[0].label, "Explicit");
        assert!(!sources[0].found);
        assert_eq!(sources.last().map(|s| s.label), Some("Default"));
    }
}
