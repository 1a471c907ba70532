//! Retriever cache configuration.
//!
//! Caching is off unless enabled explicitly or through the environment.

use std::time::Duration;

/// Default refresh interval for the cached schema snapshot.
pub const DEFAULT_REFRESH_SECS: u64 = 30;

/// Cache settings for [`SchemaRetriever`](crate::SchemaRetriever).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Period between snapshot refreshes. Always non-zero.
    pub refresh_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
        }
    }
}

impl CacheConfig {
    /// An enabled cache refreshing every `refresh_interval`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ZeroInterval` for a zero interval.
    pub fn enabled(refresh_interval: Duration) -> Result<Self, ConfigError> {
        if refresh_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(Self {
            enabled: true,
            refresh_interval,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SGOV_CACHE_ENABLED` (default: `false`)
    /// - `SGOV_CACHE_REFRESH_SECS` (default: 30, must be positive)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let enabled = match lookup("SGOV_CACHE_ENABLED") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                var: "SGOV_CACHE_ENABLED".to_string(),
                value: raw,
            })?,
            None => false,
        };
        let secs = match lookup("SGOV_CACHE_REFRESH_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => return Err(ConfigError::ZeroInterval),
                Ok(secs) => secs,
                Err(_) => {
                    return Err(ConfigError::InvalidValue {
                        var: "SGOV_CACHE_REFRESH_SECS".to_string(),
                        value: raw,
                    })
                }
            },
            None => DEFAULT_REFRESH_SECS,
        };
        Ok(Self {
            enabled,
            refresh_interval: Duration::from_secs(secs),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
    #[error("cache refresh interval must be positive")]
    ZeroInterval,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CacheConfig::default());
        assert!(!config.enabled);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = CacheConfig::from_lookup(lookup(&[
            ("SGOV_CACHE_ENABLED", "TRUE"),
            ("SGOV_CACHE_REFRESH_SECS", "5"),
        ]))
        .unwrap();
        assert!(config.enabled);
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            CacheConfig::from_lookup(lookup(&[("SGOV_CACHE_ENABLED", "maybe")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            CacheConfig::from_lookup(lookup(&[("SGOV_CACHE_REFRESH_SECS", "soon")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(
            CacheConfig::from_lookup(lookup(&[("SGOV_CACHE_REFRESH_SECS", "0")])),
            Err(ConfigError::ZeroInterval)
        );
    }

    #[test]
    fn test_enabled_constructor() {
        assert!(CacheConfig::enabled(Duration::from_millis(10)).unwrap().enabled);
        assert_eq!(CacheConfig::enabled(Duration::ZERO), Err(ConfigError::ZeroInterval));
    }
}
