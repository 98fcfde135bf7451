//! Console configuration.
//!
//! Stored as TOML at `$XDG_CONFIG_HOME/face-console/config.toml`, falling
//! back to the platform config directory.
//!
//! ```toml
//! api_url = "http://frigate.local:5000/api/"
//! page_limit = 25
//! timeout_secs = 10
//! log_level = "info"
//! ```
//!
//! `FACE_CONSOLE_API_URL` overrides `api_url` after the file is read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::model::LIMIT;

pub const API_URL_ENV: &str = "FACE_CONSOLE_API_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Root of the recognition service API.
    pub api_url: String,
    /// Faces per page.
    pub page_limit: usize,
    pub timeout_secs: u64,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/api/".to_string(),
            page_limit: LIMIT,
            timeout_secs: 10,
            log_level: "warn".to_string(),
        }
    }
}

impl ConsoleConfig {
    /// Load from the default location, then apply environment overrides.
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config)
                .join("face-console")
                .join("config.toml"));
        }
        dirs::config_dir()
            .map(|p| p.join("face-console").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            self.api_url = url.trim().to_string();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| ConfigError::Validation(format!("api_url {:?}: {e}", self.api_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(format!(
                "api_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if self.page_limit == 0 {
            return Err(ConfigError::Validation("page_limit must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, val: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe { std::env::set_var(key, val) };
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe { std::env::remove_var(key) };
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => unsafe { std::env::set_var(self.key, v) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }

    #[test]
    #[serial]
    fn missing_file_gives_defaults() {
        let _env = EnvGuard::unset(API_URL_ENV);
        let dir = TempDir::new().unwrap();
        let config = ConsoleConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, ConsoleConfig::default());
        assert_eq!(config.page_limit, 25);
    }

    #[test]
    #[serial]
    fn partial_file_keeps_other_defaults() {
        let _env = EnvGuard::unset(API_URL_ENV);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_limit = 50\n").unwrap();
        let config = ConsoleConfig::load_from(&path).unwrap();
        assert_eq!(config.page_limit, 50);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    #[serial]
    fn env_overrides_api_url() {
        let _env = EnvGuard::set(API_URL_ENV, "https://faces.example/api/");
        let dir = TempDir::new().unwrap();
        let config = ConsoleConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.api_url, "https://faces.example/api/");
    }

    #[test]
    #[serial]
    fn config_path_respects_xdg() {
        let dir = TempDir::new().unwrap();
        let _env = EnvGuard::set("XDG_CONFIG_HOME", dir.path().to_str().unwrap());
        assert_eq!(
            ConsoleConfig::config_path().unwrap(),
            dir.path().join("face-console").join("config.toml")
        );
    }

    #[test]
    #[serial]
    fn save_then_load() {
        let _env = EnvGuard::unset(API_URL_ENV);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = ConsoleConfig {
            log_level: "debug".into(),
            ..ConsoleConfig::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(ConsoleConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad_scheme = ConsoleConfig {
            api_url: "ftp://x/".into(),
            ..ConsoleConfig::default()
        };
        assert!(matches!(
            bad_scheme.validate(),
            Err(ConfigError::Validation(_))
        ));
        let zero_limit = ConsoleConfig {
            page_limit: 0,
            ..ConsoleConfig::default()
        };
        assert!(zero_limit.validate().is_err());
        let unparsable = ConsoleConfig {
            api_url: "nope".into(),
            ..ConsoleConfig::default()
        };
        assert!(unparsable.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "page_limit = [").unwrap();
        assert!(matches!(
            ConsoleConfig::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
