use serde::{Deserialize, Deserializer};
use std::env;
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

pub const DEFAULT_BACKEND_ADDRESS: &str = "127.0.0.1:8500";

pub const ADDRESS_ENV: &str = "CONSUL_HTTP_ADDR";
pub const REQUEST_TIMEOUT_ENV: &str = "DISCOVERY_REQUEST_TIMEOUT_SECS";
pub const PROBE_INTERVAL_ENV: &str = "DISCOVERY_PROBE_INTERVAL_SECS";
pub const PROBE_TIMEOUT_ENV: &str = "DISCOVERY_PROBE_TIMEOUT_SECS";
pub const PROBE_TLS_SKIP_VERIFY_ENV: &str = "DISCOVERY_PROBE_TLS_SKIP_VERIFY";

/// How the backend should probe a registered endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    #[serde(deserialize_with = "seconds")]
    pub interval: Duration,
    #[serde(deserialize_with = "seconds")]
    pub timeout: Duration,
    /// Accept self-signed or missing certificates on the probed endpoint.
    pub tls_skip_verify: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(1),
            tls_skip_verify: true,
        }
    }
}

/// Settings for reaching the discovery backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// `host:port` or `http(s)://host:port` of the backend's HTTP API.
    pub address: String,
    /// Transport timeout applied to every backend request. `None` waits
    /// for as long as the transport does.
    #[serde(deserialize_with = "optional_seconds")]
    pub request_timeout: Option<Duration>,
    pub probe: ProbeConfig,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_BACKEND_ADDRESS.to_string(),
            request_timeout: None,
            probe: ProbeConfig::default(),
        }
    }
}

impl DiscoveryConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// Build a config from the process environment, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`DiscoveryConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let address = lookup(ADDRESS_ENV)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(defaults.address);

        let request_timeout = match lookup(REQUEST_TIMEOUT_ENV) {
            Some(raw) => Some(parse_seconds(REQUEST_TIMEOUT_ENV, &raw)?),
            None => None,
        };

        let mut probe = defaults.probe;
        if let Some(raw) = lookup(PROBE_INTERVAL_ENV) {
            probe.interval = parse_seconds(PROBE_INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PROBE_TIMEOUT_ENV) {
            probe.timeout = parse_seconds(PROBE_TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = lookup(PROBE_TLS_SKIP_VERIFY_ENV) {
            probe.tls_skip_verify = parse_bool(PROBE_TLS_SKIP_VERIFY_ENV, &raw)?;
        }

        Ok(Self {
            address,
            request_timeout,
            probe,
        })
    }
}

fn parse_seconds(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(positive_seconds)
        .ok_or_else(|| {
            DiscoveryError::Configuration(format!(
                "{} must be a positive number of seconds, got {:?}",
                key, raw
            ))
        })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(DiscoveryError::Configuration(format!(
            "{} must be a boolean, got {:?}",
            key, raw
        ))),
    }
}

fn positive_seconds(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

fn seconds<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    positive_seconds(secs).ok_or_else(|| {
        serde::de::Error::custom(format!("expected a positive number of seconds, got {}", secs))
    })
}

fn optional_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(secs) => positive_seconds(secs).map(Some).ok_or_else(|| {
            serde::de::Error::custom(format!("expected a positive number of seconds, got {}", secs))
        }),
        None => Ok(None),
    }
}
