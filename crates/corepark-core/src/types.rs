//! Shared types used across corepark crates.

use serde::{Deserialize, Serialize};

/// Identifier of a physical core as numbered by the platform (`cpuN`).
pub type CoreId = u32;

/// Fixed-point scale for loads and QoS values: 1000 = 100%.
pub const MAX_LOAD: u32 = 1000;

/// Aggregate smoothed load above which waking a core is considered.
pub const HIGH_LOAD_LIMIT: u32 = 85 * MAX_LOAD / 100;

/// Load assigned to a core with no meaningful history.
pub const NEUTRAL_LOAD: u32 = MAX_LOAD / 2;

/// Direction of a core state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Core taken offline.
    Offline,
    /// Core brought online.
    Online,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Offline => "offline",
            Direction::Online => "online",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A core state transition reported by the platform that the controller
/// did not itself complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TopologyEvent {
    /// The core is gone from the machine for good.
    CoreRemoved { core: CoreId },
    /// The core came online (hotplug, operator action, or an echo of a wake).
    CoreAdded { core: CoreId },
    /// The core went offline but is still present.
    CoreOffline { core: CoreId },
    /// A requested transition failed or was cancelled by the platform.
    TransitionFailed { core: CoreId, direction: Direction },
}

impl TopologyEvent {
    /// The core the event is about.
    pub fn core(&self) -> CoreId {
        match *self {
            TopologyEvent::CoreRemoved { core }
            | TopologyEvent::CoreAdded { core }
            | TopologyEvent::CoreOffline { core }
            | TopologyEvent::TransitionFailed { core, .. } => core,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_load_limit_is_85_percent() {
        assert_eq!(HIGH_LOAD_LIMIT, 850);
        assert_eq!(NEUTRAL_LOAD, 500);
    }

    #[test]
    fn event_reports_its_core() {
        let event = TopologyEvent::TransitionFailed {
            core: 3,
            direction: Direction::Offline,
        };
        assert_eq!(event.core(), 3);
        assert_eq!(TopologyEvent::CoreRemoved { core: 7 }.core(), 7);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Offline.to_string(), "offline");
        assert_eq!(Direction::Online.to_string(), "online");
    }
}
