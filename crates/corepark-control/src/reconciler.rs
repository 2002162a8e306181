//! Topology reconciler — keeps the registry consistent with core state
//! changes the controller did not make itself.
//!
//! Failed transitions never change membership. They count against the
//! core, and after `quarantine_after` consecutive failures the core stops
//! being offered as a park candidate.

use tracing::{debug, error, info, warn};

use corepark_core::{CoreId, Direction, TopologyEvent};
use corepark_registry::{Membership, RegistryResult, Registry};

/// What a single event did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new core was added as online.
    Registered,
    /// A core was dropped from the given membership.
    Unregistered(Membership),
    /// A transition failure was counted; `quarantined` is true when this
    /// failure crossed the threshold.
    FailureRecorded { quarantined: bool },
    /// Nothing to do (echo of the controller's own action, or idempotent).
    Ignored,
}

#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    quarantine_after: u32,
}

impl Reconciler {
    pub fn new(quarantine_after: u32) -> Self {
        Self { quarantine_after }
    }

    pub fn quarantine_after(&self) -> u32 {
        self.quarantine_after
    }

    /// Apply one event. Callers must hold the registry lock.
    pub fn apply(&self, registry: &mut Registry, event: TopologyEvent) -> RegistryResult<ReconcileOutcome> {
        match event {
            TopologyEvent::CoreRemoved { core } => {
                let removed = registry.unregister(core)?;
                info!(core, membership = %removed.membership, "core removed from machine");
                Ok(ReconcileOutcome::Unregistered(removed.membership))
            }
            TopologyEvent::CoreAdded { core } => {
                if registry.contains(core) {
                    debug!(core, "core already managed");
                    return Ok(ReconcileOutcome::Ignored);
                }
                registry.register(core)?;
                info!(core, "new core online, now managed");
                Ok(ReconcileOutcome::Registered)
            }
            TopologyEvent::CoreOffline { core } => match registry.membership(core) {
                Some(Membership::Online) => {
                    registry.unregister(core)?;
                    info!(core, "core taken offline externally, no longer managed");
                    Ok(ReconcileOutcome::Unregistered(Membership::Online))
                }
                Some(Membership::Parked) => {
                    debug!(core, "offline echo for parked core");
                    Ok(ReconcileOutcome::Ignored)
                }
                None => Ok(ReconcileOutcome::Ignored),
            },
            TopologyEvent::TransitionFailed { core, direction } => {
                warn!(core, %direction, "platform reported failed core transition");
                let quarantined = self.record_failure(registry, core);
                Ok(ReconcileOutcome::FailureRecorded { quarantined })
            }
        }
    }

    /// Count a failed transition against `core`. Returns true when this
    /// failure puts the core into quarantine. Unknown cores are ignored.
    pub fn record_failure(&self, registry: &mut Registry, core: CoreId) -> bool {
        let Some(entry) = registry.get_mut(core) else {
            return false;
        };
        entry.failures = entry.failures.saturating_add(1);
        let quarantined = self.quarantine_after > 0 && entry.failures == self.quarantine_after;
        if quarantined {
            error!(
                core,
                failures = entry.failures,
                "core quarantined after repeated transition failures"
            );
        }
        quarantined
    }

    /// Clear the failure count after a successful transition.
    pub fn record_success(&self, registry: &mut Registry, core: CoreId, direction: Direction) {
        if let Some(entry) = registry.get_mut(core)
            && entry.failures > 0
        {
            debug!(core, %direction, failures = entry.failures, "core transition recovered");
            entry.failures = 0;
        }
    }
}
