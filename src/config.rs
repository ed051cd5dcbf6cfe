use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::progress::BadgePolicy;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://tubecourse.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct YouTubeConfig {
    pub api_key: String,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub youtube: Option<YouTubeConfig>,
    pub refresh_interval_secs: Option<u64>,
    pub badge_policy: BadgePolicy,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let raw_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = raw_addr.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw_addr.clone(),
                reason: e.to_string(),
            }
        })?;

        let youtube = get("YOUTUBE_API_KEY").map(|api_key| YouTubeConfig {
            api_key,
            api_base: get("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        });

        let refresh_interval_secs = match get("REFRESH_INTERVAL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        key: "REFRESH_INTERVAL_SECS",
                        value: raw,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(secs) => Some(secs),
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        key: "REFRESH_INTERVAL_SECS",
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            },
            None => None,
        };

        let badge_policy = match get("BADGE_POLICY").as_deref().map(str::to_ascii_lowercase) {
            None => BadgePolicy::strict(),
            Some(name) => match name.as_str() {
                "strict" => BadgePolicy::strict(),
                "inclusive" => BadgePolicy::inclusive(),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "BADGE_POLICY",
                        value: name,
                        reason: "expected `strict` or `inclusive`".to_string(),
                    });
                }
            },
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            bind_addr,
            youtube,
            refresh_interval_secs,
            badge_policy,
            cors_allowed_origins,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::progress::BandOrder;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).expect("defaults are valid");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr.port(), 3000);
        assert!(config.youtube.is_none());
        assert!(config.refresh_interval_secs.is_none());
        assert_eq!(config.badge_policy.order(), BandOrder::StrictDescending);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("YOUTUBE_API_KEY", "key-123"),
            ("YOUTUBE_API_BASE", "http://127.0.0.1:9999/"),
            ("REFRESH_INTERVAL_SECS", "600"),
            ("BADGE_POLICY", "Inclusive"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:5173, ,http://example.com"),
        ])
        .expect("valid config");

        let youtube = config.youtube.expect("youtube configured");
        assert_eq!(youtube.api_key, "key-123");
        assert_eq!(youtube.api_base, "http://127.0.0.1:9999");
        assert_eq!(config.refresh_interval_secs, Some(600));
        assert_eq!(config.badge_policy.order(), BandOrder::InclusiveAscending);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:5173", "http://example.com"]
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("REFRESH_INTERVAL_SECS", "soon")]).is_err());
        assert!(config_from(&[("REFRESH_INTERVAL_SECS", "0")]).is_err());
        assert!(config_from(&[("BADGE_POLICY", "rainbow")]).is_err());
        assert!(config_from(&[("BIND_ADDR", "localhost")]).is_err());
    }

    #[test]
    fn test_blank_api_key_counts_as_unset() {
        let config = config_from(&[("YOUTUBE_API_KEY", "  ")]).expect("valid config");
        assert!(config.youtube.is_none());
    }
}
