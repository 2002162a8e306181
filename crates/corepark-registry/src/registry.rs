//! Single ownership table of managed cores.

use serde::Serialize;
use tracing::debug;

use corepark_core::{CoreId, NEUTRAL_LOAD};

use crate::error::{RegistryError, RegistryResult};

/// Which side of the controller a core is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Membership {
    /// Executing work.
    Online,
    /// Taken offline by this controller.
    Parked,
}

impl std::fmt::Display for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Membership::Online => f.write_str("online"),
            Membership::Parked => f.write_str("parked"),
        }
    }
}

/// One physical core known to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedCore {
    pub id: CoreId,
    pub membership: Membership,
    /// Utilization over the last sample interval, `0..=MAX_LOAD`.
    pub instant_load: u32,
    /// Damped `instant_load`.
    pub smoothed_load: u32,
    pub last_user_time: u64,
    pub last_system_time: u64,
    /// `None` until the first sample; the next pass only sets the baseline.
    pub last_sample_time: Option<u64>,
    /// Set once `instant_load` comes from a completed delta. Cores without
    /// one add nothing to the aggregate load.
    pub has_load: bool,
    /// Order in which the core was parked; lower wakes first.
    pub parked_seq: Option<u64>,
    /// Consecutive failed platform transitions.
    pub failures: u32,
}

impl ManagedCore {
    /// A fresh online entry with neutral load and no sample baseline.
    pub fn new(id: CoreId) -> Self {
        Self {
            id,
            membership: Membership::Online,
            instant_load: NEUTRAL_LOAD,
            smoothed_load: NEUTRAL_LOAD,
            last_user_time: 0,
            last_system_time: 0,
            last_sample_time: None,
            has_load: false,
            parked_seq: None,
            failures: 0,
        }
    }

    pub fn is_online(&self) -> bool {
        self.membership == Membership::Online
    }

    pub fn is_parked(&self) -> bool {
        self.membership == Membership::Parked
    }

    /// Forget load history: neutral loads and no baseline.
    fn reset_statistics(&mut self) {
        self.instant_load = NEUTRAL_LOAD;
        self.smoothed_load = NEUTRAL_LOAD;
        self.last_user_time = 0;
        self.last_system_time = 0;
        self.last_sample_time = None;
        self.has_load = false;
    }
}

/// The controller's table of managed cores.
///
/// Iteration order is registration order; that order breaks ties when
/// choosing a core to park.
#[derive(Debug, Clone)]
pub struct Registry {
    cores: Vec<ManagedCore>,
    primary: CoreId,
    next_park_seq: u64,
}

impl Registry {
    /// Create an empty registry. `primary` is never parked.
    pub fn new(primary: CoreId) -> Self {
        Self {
            cores: Vec::new(),
            primary,
            next_park_seq: 0,
        }
    }

    pub fn primary(&self) -> CoreId {
        self.primary
    }

    fn position(&self, id: CoreId) -> Option<usize> {
        self.cores.iter().position(|c| c.id == id)
    }

    /// Add `id` as an online core with neutral load.
    pub fn register(&mut self, id: CoreId) -> RegistryResult<()> {
        if self.contains(id) {
            return Err(RegistryError::AlreadyManaged(id));
        }
        self.cores.push(ManagedCore::new(id));
        debug!(core = id, "core registered");
        Ok(())
    }

    /// Drop `id` from whichever membership holds it.
    pub fn unregister(&mut self, id: CoreId) -> RegistryResult<ManagedCore> {
        if id == self.primary {
            return Err(RegistryError::PrimaryCore(id));
        }
        let pos = self.position(id).ok_or(RegistryError::NotManaged(id))?;
        let core = self.cores.remove(pos);
        debug!(core = id, membership = %core.membership, "core unregistered");
        Ok(core)
    }

    /// Flip an online core to parked, resetting its statistics.
    pub fn move_to_parked(&mut self, id: CoreId) -> RegistryResult<()> {
        if id == self.primary {
            return Err(RegistryError::PrimaryCore(id));
        }
        let seq = self.next_park_seq;
        let core = self.get_mut(id).ok_or(RegistryError::NotFound(id))?;
        if core.membership != Membership::Online {
            return Err(RegistryError::WrongState {
                core: id,
                expected: Membership::Online,
            });
        }
        core.membership = Membership::Parked;
        core.parked_seq = Some(seq);
        core.reset_statistics();
        self.next_park_seq += 1;
        Ok(())
    }

    /// Flip a parked core back to online.
    pub fn move_to_online(&mut self, id: CoreId) -> RegistryResult<()> {
        let core = self.get_mut(id).ok_or(RegistryError::NotFound(id))?;
        if core.membership != Membership::Parked {
            return Err(RegistryError::WrongState {
                core: id,
                expected: Membership::Parked,
            });
        }
        core.membership = Membership::Online;
        core.parked_seq = None;
        Ok(())
    }

    pub fn contains(&self, id: CoreId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: CoreId) -> Option<&ManagedCore> {
        self.cores.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: CoreId) -> Option<&mut ManagedCore> {
        self.cores.iter_mut().find(|c| c.id == id)
    }

    pub fn membership(&self, id: CoreId) -> Option<Membership> {
        self.get(id).map(|c| c.membership)
    }

    /// All managed cores in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ManagedCore> {
        self.cores.iter()
    }

    /// Online cores in registration order.
    pub fn online(&self) -> impl Iterator<Item = &ManagedCore> {
        self.cores.iter().filter(|c| c.is_online())
    }

    pub fn online_mut(&mut self) -> impl Iterator<Item = &mut ManagedCore> {
        self.cores.iter_mut().filter(|c| c.is_online())
    }

    /// Parked cores, earliest-parked first.
    pub fn parked(&self) -> impl Iterator<Item = &ManagedCore> {
        let mut parked: Vec<&ManagedCore> = self.cores.iter().filter(|c| c.is_parked()).collect();
        parked.sort_by_key(|c| c.parked_seq);
        parked.into_iter()
    }

    pub fn online_ids(&self) -> Vec<CoreId> {
        self.online().map(|c| c.id).collect()
    }

    pub fn parked_ids(&self) -> Vec<CoreId> {
        self.parked().map(|c| c.id).collect()
    }

    pub fn online_count(&self) -> usize {
        self.online().count()
    }

    pub fn parked_count(&self) -> usize {
        self.cores.iter().filter(|c| c.is_parked()).count()
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// Owned copy of every entry, for readouts.
    pub fn snapshot(&self) -> Vec<ManagedCore> {
        self.cores.clone()
    }

    /// Check the membership invariants. The primary core only has to be
    /// online if it is registered at all.
    pub fn is_consistent(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        let unique = self.cores.iter().all(|c| seen.insert(c.id));
        let primary_online = self
            .get(self.primary)
            .is_none_or(|c| c.membership == Membership::Online);
        let parked_tagged = self
            .cores
            .iter()
            .all(|c| c.is_parked() == c.parked_seq.is_some());
        unique && primary_online && parked_tagged
    }
}
