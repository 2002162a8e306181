//! corepark-sysfs — Linux implementation of the corepark platform contracts.
//!
//! | Concern | Source |
//! |---|---|
//! | park / wake | write `0` / `1` to `<sysfs>/devices/system/cpu/cpuN/online` |
//! | online cores | `<sysfs>/devices/system/cpu/online` (cpu-list format) |
//! | busy counters | `cpuN` lines of `<procfs>/stat` |
//! | runnable tasks | 4th field of `<procfs>/loadavg` |
//! | topology events | polling `present` / `online` and diffing |
//!
//! Roots are configurable so everything can run against a fixture tree.

pub mod cpulist;
pub mod platform;
pub mod procfs;
pub mod watcher;

pub use cpulist::parse_cpu_list;
pub use platform::LinuxPlatform;
pub use watcher::{TopologySnapshot, TopologyWatcher, diff};
