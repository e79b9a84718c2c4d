//! Configuration loading for the GroupAlarm connector.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `GROUPALARM_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, fmt, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default API base of the GroupAlarm REST API (v1).
pub const DEFAULT_API_BASE: &str = "https://app.groupalarm.com/api/v1";
/// Default endpoint for pushing the user's availability status.
pub const DEFAULT_STATUS_URL: &str = "https://app.groupalarm.com/api/v1/user/status";

/// Application configuration derived from `GROUPALARM_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_status_url")]
    pub status_url: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
    /// Select `/alarms/alarmed` (own alarms) instead of `/alarms/user`.
    #[serde(default = "default_only_own_alarms")]
    pub only_own_alarms: bool,
    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_organization_cache_size")]
    pub organization_cache_size: usize,
}

/// How the personal access token travels with each request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// `Personal-Access-Token` request header.
    #[default]
    Header,
    /// `Personal-Access-Token` query parameter.
    Query,
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(AuthMode::Header),
            "query" => Ok(AuthMode::Query),
            _ => Err(ConfigError::InvalidAuthMode {
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Header => f.write_str("header"),
            AuthMode::Query => f.write_str("query"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            access_token: None,
            api_base: default_api_base(),
            status_url: default_status_url(),
            auth_mode: AuthMode::default(),
            only_own_alarms: default_only_own_alarms(),
            scan_interval_seconds: default_scan_interval_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            organization_cache_size: default_organization_cache_size(),
        }
    }
}

impl AppConfig {
    /// Interval between two scheduled updates.
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }

    /// Timeout applied to every outbound request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.access_token.is_some() {
            config.access_token = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration bounds.
    ///
    /// A missing access token is not a configuration error: the connector
    /// reports every update as failed until one is configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url("API_BASE", &self.api_base)?;
        validate_http_url("STATUS_URL", &self.status_url)?;

        if self.scan_interval_seconds < 10 || self.scan_interval_seconds > 86_400 {
            return Err(ConfigError::InvalidScanInterval {
                value: self.scan_interval_seconds,
            });
        }

        if self.request_timeout_seconds == 0 || self.request_timeout_seconds > 120 {
            return Err(ConfigError::InvalidRequestTimeout {
                value: self.request_timeout_seconds,
            });
        }

        // A cycle makes up to two sequential requests: alarms and user in
        // parallel, then the organization lookup.
        if self.request_timeout_seconds.saturating_mul(2) >= self.scan_interval_seconds {
            return Err(ConfigError::TimeoutExceedsInterval {
                timeout: self.request_timeout_seconds,
                interval: self.scan_interval_seconds,
            });
        }

        if self.organization_cache_size == 0 {
            return Err(ConfigError::InvalidOrganizationCacheSize);
        }

        Ok(())
    }
}

fn validate_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
        reason: source.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(())
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_status_url() -> String {
    DEFAULT_STATUS_URL.to_string()
}

fn default_only_own_alarms() -> bool {
    true
}

fn default_scan_interval_seconds() -> u64 {
    60
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_organization_cache_size() -> usize {
    32
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid auth mode '{value}'; expected 'header' or 'query'")]
    InvalidAuthMode { value: String },
    #[error("invalid boolean for {key}: '{value}'")]
    InvalidBool { key: &'static str, value: String },
    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error("scan interval must be between 10 and 86400 seconds, got {value}")]
    InvalidScanInterval { value: u64 },
    #[error("request timeout must be between 1 and 120 seconds, got {value}")]
    InvalidRequestTimeout { value: u64 },
    #[error("twice the request timeout ({timeout}s) must be shorter than the scan interval ({interval}s)")]
    TimeoutExceedsInterval { timeout: u64, interval: u64 },
    #[error("organization cache size must be at least 1")]
    InvalidOrganizationCacheSize,
}

/// Loads configuration using layered `.env` files and `GROUPALARM_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

const ENV_PREFIX: &str = "GROUPALARM_";

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads configuration: `.env`, `.env.local`, `.env.{profile}`,
    /// `.env.{profile}.local`, then the process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_non_empty(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let log_level = take_non_empty(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_non_empty(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let access_token = take_non_empty(&mut layered, "ACCESS_TOKEN");
        let api_base = take_non_empty(&mut layered, "API_BASE").unwrap_or_else(default_api_base);
        let status_url =
            take_non_empty(&mut layered, "STATUS_URL").unwrap_or_else(default_status_url);

        let auth_mode = match take_non_empty(&mut layered, "AUTH_MODE") {
            Some(value) => value.parse()?,
            None => AuthMode::default(),
        };

        let only_own_alarms = match take_non_empty(&mut layered, "ONLY_OWN_ALARMS") {
            Some(value) => parse_bool("ONLY_OWN_ALARMS", &value)?,
            None => default_only_own_alarms(),
        };

        let scan_interval_seconds = layered
            .remove("SCAN_INTERVAL_SECONDS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_scan_interval_seconds);
        let request_timeout_seconds = layered
            .remove("REQUEST_TIMEOUT_SECONDS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_request_timeout_seconds);
        let organization_cache_size = layered
            .remove("ORGANIZATION_CACHE_SIZE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_else(default_organization_cache_size);

        let config = AppConfig {
            profile,
            log_level,
            log_format,
            access_token,
            api_base,
            status_url,
            auth_mode,
            only_own_alarms,
            scan_interval_seconds,
            request_timeout_seconds,
            organization_cache_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("GROUPALARM_PROFILE")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_non_empty(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            key,
            value: value.to_string(),
        }),
    }
}
