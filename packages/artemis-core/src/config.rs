//! Runtime configuration
//!
//! Every section is optional in the JSON file; missing fields fall back to the
//! defaults below. Durations are written in milliseconds.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lights::color::DEFAULT_KELVIN;

/// Default feed server port
pub const DEFAULT_FEED_PORT: u16 = 2012;

/// UDP port LIFX bulbs listen on
pub const LIFX_PORT: u16 = 56700;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feed: FeedConfig,
    pub transitions: TransitionConfig,
    pub lights: LightsConfig,
}

impl Config {
    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Connection and read loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub host: String,
    pub port: u16,

    /// Maximum bytes read from the socket per iteration
    pub chunk_size: usize,

    /// Pause after every loop iteration
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    #[serde(rename = "connect_timeout_ms", with = "millis")]
    pub connect_timeout: Duration,

    /// Treat a silent connection as dead after this long. `None` waits forever.
    #[serde(rename = "read_timeout_ms", with = "optional_millis")]
    pub read_timeout: Option<Duration>,

    /// Idle time before TCP keepalive probes start. `None` leaves keepalive off.
    #[serde(rename = "keepalive_ms", with = "optional_millis")]
    pub keepalive: Option<Duration>,

    pub reconnect: ReconnectPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_FEED_PORT,
            chunk_size: 4096,
            poll_interval: Duration::from_millis(10),
            connect_timeout: Duration::from_secs(5),
            read_timeout: None,
            keepalive: Some(Duration::from_secs(30)),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Bounded retry with exponential backoff.
///
/// A zero `initial_backoff` retries back to back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,

    #[serde(rename = "initial_backoff_ms", with = "millis")]
    pub initial_backoff: Duration,

    #[serde(rename = "max_backoff_ms", with = "millis")]
    pub max_backoff: Duration,
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based; the first attempt never waits).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

/// Fade durations used when a state change is applied smoothly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    #[serde(rename = "fast_ms", with = "millis")]
    pub fast: Duration,

    #[serde(rename = "slow_ms", with = "millis")]
    pub slow: Duration,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            fast: Duration::from_millis(200),
            slow: Duration::from_millis(1000),
        }
    }
}

/// LIFX output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub kelvin: u16,

    /// Bulbs to drive directly. Empty means discover on the LAN.
    pub addresses: Vec<SocketAddr>,

    pub port: u16,

    #[serde(rename = "discovery_timeout_ms", with = "millis")]
    pub discovery_timeout: Duration,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            kelvin: DEFAULT_KELVIN,
            addresses: Vec::new(),
            port: LIFX_PORT,
            discovery_timeout: Duration::from_secs(1),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod optional_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
