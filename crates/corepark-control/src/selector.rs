//! Core selection for park and wake.

use corepark_core::CoreId;
use corepark_registry::{ManagedCore, Registry};

/// Whether repeated transition failures have taken `core` out of park
/// candidacy. A `quarantine_after` of zero disables quarantine.
pub fn is_quarantined(core: &ManagedCore, quarantine_after: u32) -> bool {
    quarantine_after > 0 && core.failures >= quarantine_after
}

/// Least-loaded online core by `instant_load`, skipping the primary core
/// and quarantined cores. The first core found wins ties.
pub fn pick_park_candidate(registry: &Registry, quarantine_after: u32) -> Option<CoreId> {
    let primary = registry.primary();
    let mut best: Option<&ManagedCore> = None;

    for core in registry.online() {
        if core.id == primary || is_quarantined(core, quarantine_after) {
            continue;
        }
        if best.is_none_or(|b| core.instant_load < b.instant_load) {
            best = Some(core);
        }
    }

    best.map(|c| c.id)
}

/// Earliest-parked core still parked.
pub fn pick_wake_candidate(registry: &Registry) -> Option<CoreId> {
    registry.parked().next().map(|c| c.id)
}
