//! sysfs/procfs backed platform.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use corepark_core::config::PlatformConfig;
use corepark_core::{
    CoreId, CoreTimes, CpuControl, PlatformError, PlatformResult, TaskCounter, UsageCounters,
};

use crate::cpulist::parse_cpu_list;
use crate::procfs::{parse_core_times, parse_running_tasks};

/// Fallback when `sysconf(_SC_CLK_TCK)` is unavailable.
const DEFAULT_CLK_TCK: u64 = 100;

/// Linux platform rooted at configurable sysfs and procfs mount points.
#[derive(Debug)]
pub struct LinuxPlatform {
    sysfs_root: PathBuf,
    procfs_root: PathBuf,
    clk_tck: u64,
    origin: Instant,
}

impl LinuxPlatform {
    pub fn new(sysfs_root: impl Into<PathBuf>, procfs_root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: sysfs_root.into(),
            procfs_root: procfs_root.into(),
            clk_tck: clock_ticks_per_second(),
            origin: Instant::now(),
        }
    }

    pub fn from_config(config: &PlatformConfig) -> Self {
        Self::new(config.sysfs_root.clone(), config.procfs_root.clone())
    }

    /// `<sysfs>/devices/system/cpu`.
    pub fn cpu_dir(&self) -> PathBuf {
        cpu_dir(&self.sysfs_root)
    }

    pub fn clk_tck(&self) -> u64 {
        self.clk_tck
    }

    fn write_online(&self, core: CoreId, value: &str) -> PlatformResult<()> {
        let path = self.cpu_dir().join(format!("cpu{core}")).join("online");
        // Never create the control file; its absence means "not hotpluggable".
        let written = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&path)
            .and_then(|mut file| file.write_all(value.as_bytes()));
        match written {
            Ok(()) => {
                debug!(core, value, "wrote cpu online control");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PlatformError::Unsupported(core)),
            Err(e) => Err(PlatformError::Refused {
                core,
                reason: e.to_string(),
            }),
        }
    }
}

/// `<sysfs>/devices/system/cpu`.
pub(crate) fn cpu_dir(sysfs_root: &Path) -> PathBuf {
    sysfs_root.join("devices").join("system").join("cpu")
}

fn clock_ticks_per_second() -> u64 {
    // SAFETY: sysconf has no preconditions and only reads configuration.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        ticks as u64
    } else {
        DEFAULT_CLK_TCK
    }
}

impl CpuControl for LinuxPlatform {
    fn request_offline(&self, core: CoreId) -> PlatformResult<()> {
        self.write_online(core, "0")
    }

    fn request_online(&self, core: CoreId) -> PlatformResult<()> {
        self.write_online(core, "1")
    }

    fn online_cores(&self) -> PlatformResult<Vec<CoreId>> {
        let raw = std::fs::read_to_string(self.cpu_dir().join("online"))?;
        parse_cpu_list(&raw)
    }
}

impl UsageCounters for LinuxPlatform {
    fn core_times(&self, core: CoreId) -> PlatformResult<CoreTimes> {
        let stat = std::fs::read_to_string(self.procfs_root.join("stat"))?;
        parse_core_times(&stat, core)
    }

    fn now(&self) -> u64 {
        let millis = self.origin.elapsed().as_millis() as u64;
        millis * self.clk_tck / 1000
    }
}

impl TaskCounter for LinuxPlatform {
    fn running_tasks(&self) -> PlatformResult<u32> {
        let loadavg = std::fs::read_to_string(self.procfs_root.join("loadavg"))?;
        parse_running_tasks(&loadavg)
    }
}
