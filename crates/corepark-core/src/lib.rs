//! corepark-core — shared vocabulary for the corepark workspace.
//!
//! Holds the fixed-point load scale, core identifiers, topology events,
//! the platform contracts the controller consumes, and the `corepark.toml`
//! configuration parser.

pub mod config;
pub mod platform;
pub mod types;

pub use config::CoreparkConfig;
pub use platform::{CoreTimes, CpuControl, PlatformError, PlatformResult, TaskCounter, UsageCounters};
pub use types::*;
