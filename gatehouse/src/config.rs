//! Service settings.
//!
//! Settings come from an optional YAML file, then environment variables
//! override individual fields:
//!
//! | Variable | Field |
//! |---|---|
//! | `DATABASE_URL` | `pool.resource_backend_url` |
//! | `GATEHOUSE_POOL_MIN_SIZE` | `pool.pool_min_size` |
//! | `GATEHOUSE_POOL_MAX_SIZE` | `pool.pool_max_size` |
//! | `GATEHOUSE_ACQUIRE_TIMEOUT_MS` | `pool.acquire_timeout_ms` |
//! | `GATEHOUSE_INIT_RETRY_BACKOFF_MS` | `pool.init_retry_backoff_ms` |
//! | `GATEHOUSE_LOG` | `log_level` |
//!
//! ```yaml
//! log_level: info
//! pool:
//!   resource_backend_url: postgres://bot@localhost/bot
//!   pool_min_size: 5
//!   pool_max_size: 20
//!   acquire_timeout_ms: 30000
//!   init_retry_backoff_ms: 0
//! ```

use gatehouse_std::{PoolConfig, ResourceError};
use serde::{Deserialize, Serialize};
use std::{path::Path, str::FromStr};
use thiserror::Error;

/// Connection string of the resource backend.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
/// Overrides `pool.pool_min_size`.
pub const ENV_POOL_MIN_SIZE: &str = "GATEHOUSE_POOL_MIN_SIZE";
/// Overrides `pool.pool_max_size`.
pub const ENV_POOL_MAX_SIZE: &str = "GATEHOUSE_POOL_MAX_SIZE";
/// Overrides `pool.acquire_timeout_ms`.
pub const ENV_ACQUIRE_TIMEOUT_MS: &str = "GATEHOUSE_ACQUIRE_TIMEOUT_MS";
/// Overrides `pool.init_retry_backoff_ms`.
pub const ENV_INIT_RETRY_BACKOFF_MS: &str = "GATEHOUSE_INIT_RETRY_BACKOFF_MS";
/// Overrides `log_level`.
pub const ENV_LOG_LEVEL: &str = "GATEHOUSE_LOG";

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("read config failed: {path}: {source}")]
    Read {
        /// Path of the file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid YAML for [`Settings`].
    #[error("parse config failed: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    Env {
        /// The variable name.
        var: &'static str,
        /// The raw value.
        value: String,
    },

    /// The resulting settings are inconsistent.
    #[error(transparent)]
    Invalid(#[from] ResourceError),
}

/// Top-level settings of a gatehouse service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Default log filter, used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Resource pool bounds and backend.
    #[serde(default)]
    pub pool: PoolConfig,
}

fn default_log_level() -> String {
    "info".to_owned()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            pool: PoolConfig::default(),
        }
    }
}

impl Settings {
    /// Read `path`, apply environment overrides, and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut settings = Self::from_yaml(&text)?;
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Defaults plus environment overrides, validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_overrides(|var| std::env::var(var).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse YAML text. An empty document yields the defaults.
    ///
    /// No overrides are applied and nothing is validated.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Override fields from variables returned by `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_DATABASE_URL) {
            self.pool.resource_backend_url = url;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(min) = parse_var(&lookup, ENV_POOL_MIN_SIZE)? {
            self.pool.pool_min_size = min;
        }
        if let Some(max) = parse_var(&lookup, ENV_POOL_MAX_SIZE)? {
            self.pool.pool_max_size = max;
        }
        if let Some(timeout) = parse_var(&lookup, ENV_ACQUIRE_TIMEOUT_MS)? {
            self.pool.acquire_timeout_ms = timeout;
        }
        if let Some(backoff) = parse_var(&lookup, ENV_INIT_RETRY_BACKOFF_MS)? {
            self.pool.init_retry_backoff_ms = backoff;
        }
        Ok(())
    }

    /// Check the pool bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.trim().parse() {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(ConfigError::Env { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, time::Duration};

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_yaml_with_defaults() {
        let settings = Settings::from_yaml(
            "pool:\n  resource_backend_url: postgres://db/bot\n  pool_max_size: 8\n",
        )
        .unwrap();

        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.pool.resource_backend_url, "postgres://db/bot");
        assert_eq!(settings.pool.pool_min_size, 5);
        assert_eq!(settings.pool.pool_max_size, 8);
        assert_eq!(settings.pool.acquire_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut settings = Settings::from_yaml("pool:\n  pool_min_size: 1\n").unwrap();
        settings
            .apply_overrides(env(&[
                ("DATABASE_URL", "postgres://override/bot"),
                ("GATEHOUSE_POOL_MAX_SIZE", "3"),
                ("GATEHOUSE_ACQUIRE_TIMEOUT_MS", "0"),
                ("GATEHOUSE_LOG", "debug"),
            ]))
            .unwrap();

        assert_eq!(settings.pool.resource_backend_url, "postgres://override/bot");
        assert_eq!(settings.pool.pool_min_size, 1);
        assert_eq!(settings.pool.pool_max_size, 3);
        assert_eq!(settings.pool.acquire_timeout(), None);
        assert_eq!(settings.log_level, "debug");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_bad_env_value_is_reported() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(env(&[("GATEHOUSE_POOL_MIN_SIZE", "many")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Env { var: "GATEHOUSE_POOL_MIN_SIZE", ref value } if value == "many"
        ));
    }

    #[test]
    fn test_env_sets_init_retry_backoff() {
        let mut settings = Settings::from_yaml("pool:\n  init_retry_backoff_ms: 100\n").unwrap();
        assert_eq!(
            settings.pool.init_retry_backoff(),
            Duration::from_millis(100)
        );

        settings
            .apply_overrides(env(&[("GATEHOUSE_INIT_RETRY_BACKOFF_MS", "2500")]))
            .unwrap();
        assert_eq!(settings.pool.init_retry_backoff_ms, 2500);
        assert_eq!(
            settings.pool.init_retry_backoff(),
            Duration::from_millis(2500)
        );

        let err = settings
            .apply_overrides(env(&[("GATEHOUSE_INIT_RETRY_BACKOFF_MS", "-1")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Env { var: "GATEHOUSE_INIT_RETRY_BACKOFF_MS", .. }
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(env(&[("GATEHOUSE_POOL_MAX_SIZE", "2")]))
            .unwrap();

        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load("/nonexistent/gatehouse.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = Settings::from_yaml("pool: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
