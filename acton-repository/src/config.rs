//! Configuration management using Figment

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Environment variable prefix; nested keys are separated by `__`
/// (e.g. `ACTON_REPOSITORY_PAGING__MAX_PAGE_SIZE=50`)
pub const ENV_PREFIX: &str = "ACTON_REPOSITORY_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Service identity and logging
    #[serde(default)]
    pub service: ServiceConfig,

    /// Paging defaults applied to externally supplied page parameters
    #[serde(default)]
    pub paging: PagingConfig,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

/// Paging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size used when a request does not name one
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Upper bound for requested page sizes
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Sort applied when a request does not name one, e.g. `"created_date,desc"`
    #[serde(default)]
    pub default_sort: Option<String>,

    /// Whether external page numbers start at 1
    #[serde(default)]
    pub one_indexed: bool,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            default_sort: None,
            one_indexed: false,
        }
    }
}

fn default_service_name() -> String {
    "acton-repository".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

impl Config {
    /// Load configuration from `./config.toml` (if present) and the environment
    ///
    /// Environment variables (`ACTON_REPOSITORY_` prefix) override the file.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load configuration from a specific file
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading configuration from: {}", path.display());
        }

        let config = Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            // Environment variables have highest priority
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.paging.default_page_size, 20);
        assert_eq!(config.paging.max_page_size, 100);
        assert!(config.paging.default_sort.is_none());
        assert!(!config.paging.one_indexed);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.paging, PagingConfig::default());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "members"

[paging]
max_page_size = 50
default_sort = "username,desc"
one_indexed = true
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "members");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.paging.default_page_size, 20);
        assert_eq!(config.paging.max_page_size, 50);
        assert_eq!(config.paging.default_sort.as_deref(), Some("username,desc"));
        assert!(config.paging.one_indexed);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[paging]\nmax_page_size = \"lots\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(_)));
    }
}
