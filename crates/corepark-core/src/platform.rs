//! Contracts the controller consumes from the platform.
//!
//! All calls are synchronous from the controller's point of view: a park or
//! wake request returns only once the platform has accepted or refused it.

use thiserror::Error;

use crate::types::CoreId;

/// Convenience alias for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors reported by a platform implementation.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("core {0} does not support hotplug")]
    Unsupported(CoreId),

    #[error("core {0} is unknown to the platform")]
    UnknownCore(CoreId),

    #[error("platform refused transition of core {core}: {reason}")]
    Refused { core: CoreId, reason: String },

    #[error("malformed platform data: {0}")]
    Parse(String),

    #[error("platform i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cumulative busy-time counters for one core, in clock ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreTimes {
    pub user: u64,
    pub system: u64,
}

/// Takes cores offline and brings them back.
pub trait CpuControl: Send + Sync {
    /// Take `core` offline.
    fn request_offline(&self, core: CoreId) -> PlatformResult<()>;

    /// Bring `core` online.
    fn request_online(&self, core: CoreId) -> PlatformResult<()>;

    /// Cores currently online, in ascending order.
    fn online_cores(&self) -> PlatformResult<Vec<CoreId>>;
}

/// Per-core cumulative usage counters and a monotonic clock.
pub trait UsageCounters: Send + Sync {
    /// Cumulative user and system time of `core`.
    fn core_times(&self, core: CoreId) -> PlatformResult<CoreTimes>;

    /// Monotonic clock in the same tick unit as [`CoreTimes`].
    fn now(&self) -> u64;
}

/// System-wide runnable task count.
pub trait TaskCounter: Send + Sync {
    fn running_tasks(&self) -> PlatformResult<u32>;
}
