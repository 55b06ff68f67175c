//! config-rs/lib.rs
//! Startup configuration for the smart proxy.
//! Values are read once, validated, and then shared read-only by every request.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const SERVICE_ADDR_KEY: &str = "SMART_PROXY_SERVICE_ADDR";
pub const SERVICE_PORT_KEY: &str = "SMART_PROXY_SERVICE_PORT";
pub const DEFAULT_PORT: u16 = 8787;

const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_LOCAL_MODEL: &str = "llama3.1:8b";
const DEFAULT_LOCAL_ALIAS: &str = "local";
const DEFAULT_REMOTE_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REMOTE_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_REQUEST_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// A credential that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Byte-exact comparison against a presented credential.
    pub fn matches(&self, presented: &str) -> bool {
        self.0.as_bytes() == presented.as_bytes()
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Immutable process configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub proxy_secret: Secret,
    pub bind_addr: SocketAddr,
    pub local_base_url: String,
    pub local_default_model: String,
    pub local_alias: String,
    pub remote_base_url: String,
    pub remote_api_key: Secret,
    pub remote_model: String,
    pub remote_secondary_api_key: Option<Secret>,
    pub remote_secondary_caller: Option<String>,
    pub tools_base_url: String,
    pub upstream_timeout: Duration,
    pub max_request_bytes: usize,
}

impl ProxyConfig {
    /// Load `.env` if present, then build from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_ok() {
            log::debug!("Loaded settings from .env");
        }
        let vars: HashMap<String, String> = env::vars().collect();
        Self::from_map(&vars)
    }

    /// Build from an explicit key/value map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let proxy_secret = get("PROXY_SECRET")
            .map(Secret::new)
            .ok_or(ConfigError::Missing("PROXY_SECRET"))?;

        let remote_base_url =
            trim_url(get("REMOTE_LLM_BASE_URL").unwrap_or(DEFAULT_REMOTE_BASE_URL));
        let tools_base_url = get("TOOLS_BASE_URL")
            .map(trim_url)
            .unwrap_or_else(|| format!("{}/tools", remote_base_url));

        let timeout_secs = parse_or(vars, "UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        let remote_api_key = Secret::new(get("REMOTE_LLM_API_KEY").unwrap_or_default());
        if remote_api_key.is_empty() {
            log::warn!("REMOTE_LLM_API_KEY is not set; remote calls will be rejected upstream");
        }

        Ok(Self {
            proxy_secret,
            bind_addr: get_bind_address(vars, DEFAULT_PORT)?,
            local_base_url: trim_url(get("LOCAL_LLM_BASE_URL").unwrap_or(DEFAULT_LOCAL_BASE_URL)),
            local_default_model: get("LOCAL_LLM_DEFAULT_MODEL")
                .unwrap_or(DEFAULT_LOCAL_MODEL)
                .to_string(),
            local_alias: get("LOCAL_LLM_ALIAS").unwrap_or(DEFAULT_LOCAL_ALIAS).to_string(),
            remote_base_url,
            remote_api_key,
            remote_model: get("REMOTE_LLM_MODEL").unwrap_or(DEFAULT_REMOTE_MODEL).to_string(),
            remote_secondary_api_key: get("REMOTE_LLM_SECONDARY_API_KEY").map(Secret::new),
            remote_secondary_caller: get("REMOTE_LLM_SECONDARY_CALLER").map(str::to_string),
            tools_base_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
            max_request_bytes: parse_or(vars, "MAX_REQUEST_BYTES", DEFAULT_MAX_REQUEST_BYTES)?,
        })
    }
}

fn trim_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse::<T>().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
        None => Ok(default),
    }
}

/// Get service port from the settings map, falling back to the default when unset
pub fn get_service_port(
    vars: &HashMap<String, String>,
    default_port: u16,
) -> Result<u16, ConfigError> {
    match vars.get(SERVICE_PORT_KEY).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse::<u16>().map_err(|_| ConfigError::Invalid {
            key: SERVICE_PORT_KEY,
            value: raw.to_string(),
        }),
        None => Ok(default_port),
    }
}

/// Resolve the bind address.
///
/// A full `SMART_PROXY_SERVICE_ADDR` override wins (plain `host:port` or `http://host:port`),
/// then `SMART_PROXY_SERVICE_PORT` on all interfaces, then the default port. A value that is
/// set but unparseable is an error.
pub fn get_bind_address(
    vars: &HashMap<String, String>,
    default_port: u16,
) -> Result<SocketAddr, ConfigError> {
    let addr_override = vars
        .get(SERVICE_ADDR_KEY)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty());

    if let Some(addr_str) = addr_override {
        let stripped = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(addr_str);
        return stripped.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            key: SERVICE_ADDR_KEY,
            value: addr_str.to_string(),
        });
    }

    let port = get_service_port(vars, default_port)?;
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_apply() {
        let config = ProxyConfig::from_map(&vars(&[("PROXY_SECRET", "s3cret")])).unwrap();

        assert!(config.proxy_secret.matches("s3cret"));
        assert_eq!(config.bind_addr, "0.0.0.0:8787".parse().unwrap());
        assert_eq!(config.local_base_url, "http://localhost:11434");
        assert_eq!(config.local_alias, "local");
        assert_eq!(config.remote_model, "gpt-4o");
        assert_eq!(config.tools_base_url, "https://api.openai.com/v1/tools");
        assert_eq!(config.upstream_timeout, Duration::from_secs(60));
        assert!(config.remote_secondary_api_key.is_none());
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = ProxyConfig::from_map(&vars(&[("PROXY_SECRET", "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("PROXY_SECRET"));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let err = ProxyConfig::from_map(&vars(&[
            ("PROXY_SECRET", "x"),
            ("UPSTREAM_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "UPSTREAM_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn test_urls_are_trimmed_and_tools_follow_remote() {
        let config = ProxyConfig::from_map(&vars(&[
            ("PROXY_SECRET", "x"),
            ("REMOTE_LLM_BASE_URL", "http://remote.test/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.remote_base_url, "http://remote.test/v1");
        assert_eq!(config.tools_base_url, "http://remote.test/v1/tools");
    }

    #[test]
    fn test_secret_matching_is_exact() {
        let secret = Secret::new("Token-ABC");
        assert!(secret.matches("Token-ABC"));
        assert!(!secret.matches("token-abc"));
        assert!(!secret.matches("Token-ABC "));
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        assert_eq!(secret.to_string(), "***");
    }

    #[test]
    fn test_get_bind_address() {
        let addr = get_bind_address(
            &vars(&[(SERVICE_ADDR_KEY, "http://127.0.0.1:9000"), (SERVICE_PORT_KEY, "9001")]),
            8000,
        )
        .unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());

        let addr = get_bind_address(&vars(&[(SERVICE_PORT_KEY, "9001")]), 8000).unwrap();
        assert_eq!(addr, "0.0.0.0:9001".parse().unwrap());

        let addr = get_bind_address(&vars(&[]), 8000).unwrap();
        assert_eq!(addr, "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn test_invalid_bind_settings_are_rejected() {
        let err = get_service_port(&vars(&[(SERVICE_PORT_KEY, "nope")]), 8000).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref value, .. } if value == "nope"));

        let err = ProxyConfig::from_map(&vars(&[
            ("PROXY_SECRET", "x"),
            ("SMART_PROXY_SERVICE_PORT", "99999"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SMART_PROXY_SERVICE_PORT", .. }));

        let err = ProxyConfig::from_map(&vars(&[
            ("PROXY_SECRET", "x"),
            ("SMART_PROXY_SERVICE_ADDR", "localhost"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SMART_PROXY_SERVICE_ADDR", .. }));
    }
}
