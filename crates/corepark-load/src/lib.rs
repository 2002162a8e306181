//! corepark-load — per-core utilization sampling and smoothing.
//!
//! # Pipeline
//!
//! ```text
//! UsageCounters ──sample()──▶ instant_load (per online core)
//!                                 │
//!                     smooth_cores()
//!                                 ▼
//!                  smoothed_load ──▶ sum_smoothed_load
//! ```
//!
//! All arithmetic is integer fixed-point on the `MAX_LOAD` scale with
//! truncating division; the decision thresholds are calibrated to it.

pub mod sampler;
pub mod smoother;

use corepark_core::UsageCounters;
use corepark_registry::Registry;

pub use sampler::{instant_load, sample, SampleReport};
pub use smoother::{smooth, smooth_cores, sum_smoothed_load};

/// Outcome of one sample-and-smooth pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Online cores seen this pass.
    pub nr_cores: u32,
    /// Sum of `smoothed_load` over online cores that have a load.
    pub sum_smoothed_load: u32,
    pub report: SampleReport,
}

/// Sample every online core and fold the fresh values into the smoothed
/// loads.
pub fn update_loads(
    registry: &mut Registry,
    counters: &dyn UsageCounters,
    smoothing_coefficient: u32,
) -> LoadSummary {
    let report = sample(registry, counters);
    let sum_smoothed_load = smooth_cores(registry, &report.sampled, smoothing_coefficient);
    LoadSummary {
        nr_cores: registry.online_count() as u32,
        sum_smoothed_load,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corepark_core::{CoreId, CoreTimes, PlatformResult};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Cores that never do any work.
    #[derive(Default)]
    struct IdleCounters {
        now: AtomicU64,
    }

    impl UsageCounters for IdleCounters {
        fn core_times(&self, _core: CoreId) -> PlatformResult<CoreTimes> {
            Ok(CoreTimes::default())
        }

        fn now(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn baselined_cores_add_no_load() {
        let mut reg = Registry::new(0);
        reg.register(0).unwrap();
        reg.register(1).unwrap();
        let counters = IdleCounters::default();

        let summary = update_loads(&mut reg, &counters, 4);
        assert_eq!(summary.report.baselined, vec![0, 1]);
        assert_eq!(summary.nr_cores, 2);
        assert_eq!(summary.sum_smoothed_load, 0);

        // Second pass: idle for 100 ticks, 500 - 500 / 4 = 375 each.
        counters.now.store(100, Ordering::SeqCst);
        let summary = update_loads(&mut reg, &counters, 4);
        assert_eq!(summary.report.sampled, vec![0, 1]);
        assert_eq!(summary.sum_smoothed_load, 750);
    }

    #[test]
    fn newly_added_core_joins_sum_after_its_second_sample() {
        let mut reg = Registry::new(0);
        reg.register(0).unwrap();
        let counters = IdleCounters::default();
        update_loads(&mut reg, &counters, 1);

        counters.now.store(100, Ordering::SeqCst);
        reg.register(1).unwrap();
        let summary = update_loads(&mut reg, &counters, 1);
        // Core 0 is idle with coefficient 1; core 1 only baselined.
        assert_eq!(summary.sum_smoothed_load, 0);
        assert_eq!(summary.report.baselined, vec![1]);
        assert!(!reg.get(1).unwrap().has_load);

        counters.now.store(200, Ordering::SeqCst);
        update_loads(&mut reg, &counters, 1);
        assert!(reg.get(1).unwrap().has_load);
    }
}
