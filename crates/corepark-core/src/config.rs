//! corepark.toml configuration parser.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::types::{CoreId, MAX_LOAD};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreparkConfig {
    pub controller: ControllerConfig,
    pub platform: PlatformConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// QoS floor in `0..=MAX_LOAD`. The default never parks under load.
    pub target_qof: u32,
    pub period_ms: u32,
    /// Larger values make the smoothed load react more slowly.
    pub smoothing_coefficient: u32,
    /// Core that is never parked.
    pub primary_core: CoreId,
    /// Consecutive transition failures before a core stops being parked.
    pub quarantine_after: u32,
    /// Start the control loop as soon as the daemon is up.
    pub start_active: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target_qof: MAX_LOAD,
            period_ms: 250,
            smoothing_coefficient: 4,
            primary_core: 0,
            quarantine_after: 3,
            start_active: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub sysfs_root: PathBuf,
    pub procfs_root: PathBuf,
    pub watch_interval_ms: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            procfs_root: PathBuf::from("/proc"),
            watch_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    pub listen: SocketAddr,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 8455)),
        }
    }
}

impl CoreparkConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: CoreparkConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let c = &self.controller;
        if c.target_qof > MAX_LOAD {
            bail!("controller.target_qof must be <= {MAX_LOAD}, got {}", c.target_qof);
        }
        if c.period_ms == 0 {
            bail!("controller.period_ms must be > 0");
        }
        if c.smoothing_coefficient == 0 {
            bail!("controller.smoothing_coefficient must be >= 1");
        }
        if self.platform.watch_interval_ms == 0 {
            bail!("platform.watch_interval_ms must be > 0");
        }
        Ok(())
    }
}
