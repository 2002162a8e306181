//! Load smoother.
//!
//! Moves the smoothed value a fixed fraction of the way towards the latest
//! instantaneous load each pass, so short bursts that will be over before a
//! core could be woken do not trigger a reaction.

use corepark_core::CoreId;
use corepark_registry::Registry;

/// One smoothing step: close `1 / coefficient` of the gap, truncating.
///
/// The result always lies between `smoothed` and `instant` inclusive.
pub fn smooth(smoothed: u32, instant: u32, coefficient: u32) -> u32 {
    let delta = smoothed.abs_diff(instant);
    let step = delta / coefficient.max(1);

    if smoothed < instant {
        smoothed + step
    } else if step < smoothed {
        smoothed - step
    } else {
        0
    }
}

/// Smooth the freshly sampled cores and return the aggregate smoothed load
/// over the online cores that have a load.
pub fn smooth_cores(registry: &mut Registry, fresh: &[CoreId], coefficient: u32) -> u32 {
    for core in registry.online_mut() {
        if fresh.contains(&core.id) {
            core.smoothed_load = smooth(core.smoothed_load, core.instant_load, coefficient);
        }
    }
    sum_smoothed_load(registry)
}

/// Sum of `smoothed_load` over online cores with at least one completed
/// sample interval. Cores skipped this pass keep their last value.
pub fn sum_smoothed_load(registry: &Registry) -> u32 {
    registry
        .online()
        .filter(|c| c.has_load)
        .map(|c| c.smoothed_load)
        .sum()
}
