//! Settings for the axewatch host.
//!
//! Settings come from an optional TOML file, then `AXEWATCH_*` environment
//! variables, then command line flags (applied by the binary).
//!
//! ```toml
//! interval_secs = 30
//! timeout_secs = 10
//! stale_policy = "retain"
//!
//! [[devices]]
//! id = "garage"
//! ip_address = "192.168.1.42"
//!
//! [[devices]]
//! ip_address = "192.168.1.43"
//! ```

use std::collections::BTreeSet;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axewatch_sdk::{CoordinatorConfig, StalePolicy};
use config::{Config, Environment, File};
use serde::Deserialize;

/// One configured device.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Stable id; defaults to the IP address.
    #[serde(default)]
    pub id: Option<String>,
    /// Host or IP (optionally with port) of the device.
    pub ip_address: String,
}

impl DeviceConfig {
    /// The id the device is registered under.
    pub fn device_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.ip_address)
    }
}

/// Parses `ip` or `id=ip`.
impl FromStr for DeviceConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, ip_address) = match s.split_once('=') {
            Some((id, ip)) => (Some(id.trim()), ip.trim()),
            None => (None, s.trim()),
        };

        if ip_address.is_empty() {
            return Err(format!("missing device address in '{}'", s));
        }
        if id.is_some_and(str::is_empty) {
            return Err(format!("empty device id in '{}'", s));
        }

        Ok(DeviceConfig {
            id: id.map(str::to_string),
            ip_address: ip_address.to_string(),
        })
    }
}

/// Settings are flat, so `AXEWATCH_INTERVAL_SECS` maps to `interval_secs`.
fn environment() -> Environment {
    Environment::with_prefix("AXEWATCH")
}

/// Host settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between scheduled refreshes.
    pub interval_secs: u64,
    /// Upper bound on one fetch, in seconds.
    pub timeout_secs: u64,
    /// "retain" or "clear".
    pub stale_policy: String,
    pub devices: Vec<DeviceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            timeout_secs: 10,
            stale_policy: "retain".to_string(),
            devices: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus `AXEWATCH_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, environment())
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(env)
            .build()
            .context("failed to read settings")?;

        config
            .try_deserialize()
            .context("invalid settings")
    }

    /// Coordinator settings derived from these host settings.
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig> {
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }

        let stale_policy = StalePolicy::from_str(&self.stale_policy).map_err(anyhow::Error::msg)?;

        Ok(CoordinatorConfig {
            interval: Duration::from_secs(self.interval_secs),
            fetch_timeout: Duration::from_secs(self.timeout_secs),
            stale_policy,
        })
    }

    /// The configured devices, checked for emptiness and duplicate ids.
    pub fn validated_devices(&self) -> Result<&[DeviceConfig]> {
        if self.devices.is_empty() {
            bail!("no devices configured; pass --device or add [[devices]] to the config file");
        }

        let mut seen = BTreeSet::new();
        for device in &self.devices {
            if !seen.insert(device.device_id()) {
                bail!("device id '{}' is configured twice", device.device_id());
            }
        }

        Ok(&self.devices)
    }
}
