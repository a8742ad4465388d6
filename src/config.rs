use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Environment variable overriding the interface the listener binds to.
pub const LISTEN_HOST_ENV: &str = "LISTEN_HOST";

/// Size and timing knobs for the server.
///
/// Every field has a default, so a YAML file only needs the keys it
/// wants to change:
///
/// ```yaml
/// max_payload: 512
/// grace_period_ms: 2500
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Upper bound on simultaneously open connections
    pub max_connections: usize,

    /// Bytes buffered per connection while waiting for a newline
    pub inbound_capacity: usize,

    /// Bytes queued per connection before it is dropped as too slow
    pub outbound_capacity: usize,

    /// Chat payloads longer than this are truncated
    pub max_payload: usize,

    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,

    #[serde(rename = "grace_period_ms", with = "millis")]
    pub grace_period: Duration,

    #[serde(rename = "drain_timeout_ms", with = "millis")]
    pub drain_timeout: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_connections: 1024,
            inbound_capacity: 2048,
            outbound_capacity: 10 * 1024 * 1024,
            max_payload: 1024,
            poll_interval: Duration::from_millis(100),
            grace_period: Duration::from_secs(1),
            drain_timeout: Duration::from_secs(1),
        }
    }
}

impl Tuning {
    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(raw).context("invalid tuning document")
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub expected_clients: usize,
    pub tuning: Tuning,
}

impl Config {
    /// Builds a config listening on `port` on every interface, unless
    /// `LISTEN_HOST` names a specific one.
    pub fn load(port: u16, expected_clients: usize) -> anyhow::Result<Self> {
        let host = match std::env::var(LISTEN_HOST_ENV) {
            Ok(raw) => raw
                .parse::<IpAddr>()
                .with_context(|| format!("{LISTEN_HOST_ENV} is not an IP address: {raw}"))?,
            Err(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        Ok(Self {
            listen_addr: SocketAddr::new(host, port),
            expected_clients,
            tuning: Tuning::default(),
        })
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.tuning;

        if self.expected_clients == 0 {
            anyhow::bail!("expected client count must be at least 1");
        }
        if t.max_connections == 0 {
            anyhow::bail!("max_connections must be at least 1");
        }
        if t.inbound_capacity < 2 {
            anyhow::bail!("inbound_capacity must hold at least a type byte and a newline");
        }
        if t.outbound_capacity == 0 {
            anyhow::bail!("outbound_capacity must be non-zero");
        }
        // A full-length chat line (type + payload + newline) has to fit
        if t.max_payload > t.inbound_capacity - 2 {
            anyhow::bail!(
                "max_payload ({}) does not fit in inbound_capacity ({})",
                t.max_payload,
                t.inbound_capacity
            );
        }
        if t.poll_interval.is_zero() || t.drain_timeout.is_zero() {
            anyhow::bail!("poll_interval_ms and drain_timeout_ms must be non-zero");
        }

        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
