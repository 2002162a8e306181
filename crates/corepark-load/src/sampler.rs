//! Load sampler — derives instantaneous utilization from cumulative
//! counters.
//!
//! A core needs two samples before it has a load: the first pass only
//! records the baseline.

use tracing::{trace, warn};

use corepark_core::{CoreId, UsageCounters, MAX_LOAD};
use corepark_registry::Registry;

/// Which cores got what treatment in one sampling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleReport {
    /// Cores with a freshly computed `instant_load`.
    pub sampled: Vec<CoreId>,
    /// Cores that only recorded a baseline this pass.
    pub baselined: Vec<CoreId>,
    /// Cores whose counters could not be read.
    pub unreadable: Vec<CoreId>,
}

/// Utilization over an interval on the `MAX_LOAD` scale, clamped.
///
/// A zero-length interval yields zero.
pub fn instant_load(busy_delta: u64, elapsed_delta: u64) -> u32 {
    if elapsed_delta == 0 {
        return 0;
    }
    let load = busy_delta.saturating_mul(MAX_LOAD as u64) / elapsed_delta;
    load.min(MAX_LOAD as u64) as u32
}

/// Read counters for every online core and update `instant_load`.
pub fn sample(registry: &mut Registry, counters: &dyn UsageCounters) -> SampleReport {
    let mut report = SampleReport::default();
    let now = counters.now();

    for core in registry.online_mut() {
        let times = match counters.core_times(core.id) {
            Ok(t) => t,
            Err(e) => {
                warn!(core = core.id, error = %e, "failed to read core counters");
                report.unreadable.push(core.id);
                continue;
            }
        };

        match core.last_sample_time {
            None => report.baselined.push(core.id),
            Some(prev) => {
                // Counters that went backwards count as idle.
                let busy = times.user.saturating_sub(core.last_user_time)
                    + times.system.saturating_sub(core.last_system_time);
                let elapsed = now.saturating_sub(prev);
                core.instant_load = instant_load(busy, elapsed);
                core.has_load = true;
                trace!(core = core.id, busy, elapsed, load = core.instant_load, "core sampled");
                report.sampled.push(core.id);
            }
        }

        core.last_user_time = times.user;
        core.last_system_time = times.system;
        core.last_sample_time = Some(now);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use corepark_core::{CoreTimes, PlatformError, PlatformResult, NEUTRAL_LOAD};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCounters {
        now: Mutex<u64>,
        times: Mutex<HashMap<CoreId, CoreTimes>>,
    }

    impl FakeCounters {
        fn set(&self, now: u64, entries: &[(CoreId, u64, u64)]) {
            *self.now.lock().unwrap() = now;
            let mut times = self.times.lock().unwrap();
            for &(id, user, system) in entries {
                times.insert(id, CoreTimes { user, system });
            }
        }
    }

    impl UsageCounters for FakeCounters {
        fn core_times(&self, core: CoreId) -> PlatformResult<CoreTimes> {
            self.times
                .lock()
                .unwrap()
                .get(&core)
                .copied()
                .ok_or(PlatformError::UnknownCore(core))
        }

        fn now(&self) -> u64 {
            *self.now.lock().unwrap()
        }
    }

    fn registry_with(ids: &[CoreId]) -> Registry {
        let mut reg = Registry::new(0);
        for &id in ids {
            reg.register(id).unwrap();
        }
        reg
    }

    #[test]
    fn instant_load_scales_and_clamps() {
        assert_eq!(instant_load(50, 100), 500);
        assert_eq!(instant_load(100, 100), MAX_LOAD);
        assert_eq!(instant_load(250, 100), MAX_LOAD);
        assert_eq!(instant_load(1, 3), 333);
        assert_eq!(instant_load(0, 100), 0);
    }

    #[test]
    fn zero_elapsed_is_zero_load() {
        assert_eq!(instant_load(10, 0), 0);
    }

    #[test]
    fn first_pass_only_baselines() {
        let mut reg = registry_with(&[0, 1]);
        let counters = FakeCounters::default();
        counters.set(100, &[(0, 10, 5), (1, 20, 5)]);

        let report = sample(&mut reg, &counters);
        assert!(report.sampled.is_empty());
        assert_eq!(report.baselined, vec![0, 1]);

        let core = reg.get(1).unwrap();
        assert_eq!(core.instant_load, NEUTRAL_LOAD);
        assert!(!core.has_load);
        assert_eq!(core.last_user_time, 20);
        assert_eq!(core.last_sample_time, Some(100));
    }

    #[test]
    fn second_pass_computes_delta_load() {
        let mut reg = registry_with(&[0, 1]);
        let counters = FakeCounters::default();
        counters.set(100, &[(0, 0, 0), (1, 0, 0)]);
        sample(&mut reg, &counters);

        // core 0: 25 busy ticks of 100, core 1: 60 + 30 of 100.
        counters.set(200, &[(0, 20, 5), (1, 60, 30)]);
        let report = sample(&mut reg, &counters);

        assert_eq!(report.sampled, vec![0, 1]);
        assert_eq!(reg.get(0).unwrap().instant_load, 250);
        assert_eq!(reg.get(1).unwrap().instant_load, 900);
        assert!(reg.get(0).unwrap().has_load);
    }

    #[test]
    fn parked_cores_are_not_sampled() {
        let mut reg = registry_with(&[0, 1]);
        reg.move_to_parked(1).unwrap();
        let counters = FakeCounters::default();
        counters.set(100, &[(0, 0, 0), (1, 0, 0)]);

        let report = sample(&mut reg, &counters);
        assert_eq!(report.baselined, vec![0]);
        assert!(reg.get(1).unwrap().last_sample_time.is_none());
    }

    #[test]
    fn unreadable_core_keeps_previous_values() {
        let mut reg = registry_with(&[0, 3]);
        let counters = FakeCounters::default();
        counters.set(100, &[(0, 0, 0)]);

        let report = sample(&mut reg, &counters);
        assert_eq!(report.unreadable, vec![3]);
        assert_eq!(reg.get(3).unwrap().instant_load, NEUTRAL_LOAD);
        assert!(reg.get(3).unwrap().last_sample_time.is_none());
    }

    #[test]
    fn counter_reset_reads_as_idle() {
        let mut reg = registry_with(&[0]);
        let counters = FakeCounters::default();
        counters.set(100, &[(0, 500, 500)]);
        sample(&mut reg, &counters);

        counters.set(200, &[(0, 10, 10)]);
        sample(&mut reg, &counters);
        assert_eq!(reg.get(0).unwrap().instant_load, 0);
    }
}
