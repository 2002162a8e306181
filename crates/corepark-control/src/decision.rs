//! Park/wake decision engine.
//!
//! Pure functions of the per-pass inputs; the controller applies the
//! result. Parking is checked first and at most one action is returned.

use corepark_core::{CoreId, HIGH_LOAD_LIMIT, MAX_LOAD};

/// Everything the decision rule looks at in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionInputs {
    pub nr_cores: u32,
    pub sum_smoothed_load: u32,
    pub running_tasks: u32,
    pub target_qof: u32,
    pub parked_count: u32,
}

/// Structural change to apply this pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Park(CoreId),
    Wake(CoreId),
    Hold,
}

/// QoS margin left if one of `nr_cores` were parked. Higher means more
/// headroom.
pub fn predicted_qof(nr_cores: u32, sum_smoothed_load: u32) -> u64 {
    let max = MAX_LOAD as u64;
    let remaining = nr_cores.saturating_sub(1) as u64;
    (max * remaining) * max / (sum_smoothed_load as u64 + 1)
}

/// Parking keeps the predicted margin at or above the QoS floor.
pub fn should_park(inputs: &DecisionInputs) -> bool {
    inputs.nr_cores > 1
        && predicted_qof(inputs.nr_cores, inputs.sum_smoothed_load) >= inputs.target_qof as u64
}

/// The system is heavily loaded overall and the per-core task backlog
/// exceeds the threshold derived from the QoS target.
pub fn should_wake(inputs: &DecisionInputs) -> bool {
    if inputs.nr_cores == 0 {
        return false;
    }
    inputs.parked_count > 0
        && inputs.sum_smoothed_load > HIGH_LOAD_LIMIT
        && inputs.running_tasks / inputs.nr_cores > MAX_LOAD / inputs.target_qof.saturating_add(1)
}

/// Apply the decision rule. A park decision without an eligible candidate
/// falls through to the wake check.
pub fn decide(
    inputs: &DecisionInputs,
    park_candidate: Option<CoreId>,
    wake_candidate: Option<CoreId>,
) -> Decision {
    if should_park(inputs)
        && let Some(core) = park_candidate
    {
        return Decision::Park(core);
    }

    if should_wake(inputs)
        && let Some(core) = wake_candidate
    {
        return Decision::Wake(core);
    }

    Decision::Hold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(nr_cores: u32, sum: u32, running: u32, qof: u32, parked: u32) -> DecisionInputs {
        DecisionInputs {
            nr_cores,
            sum_smoothed_load: sum,
            running_tasks: running,
            target_qof: qof,
            parked_count: parked,
        }
    }

    #[test]
    fn predicted_qof_matches_fixed_point_formula() {
        assert_eq!(predicted_qof(4, 400), 7481);
        assert_eq!(predicted_qof(1, 0), 0);
        assert_eq!(predicted_qof(2, 0), 1_000_000);
        assert_eq!(predicted_qof(0, 0), 0);
    }

    #[test]
    fn parks_when_headroom_is_large() {
        let i = inputs(4, 400, 1, 500, 0);
        assert_eq!(decide(&i, Some(1), None), Decision::Park(1));
    }

    #[test]
    fn never_parks_last_core() {
        let i = inputs(1, 0, 0, 0, 0);
        assert!(!should_park(&i));
        assert_eq!(decide(&i, Some(1), None), Decision::Hold);
    }

    #[test]
    fn holds_when_predicted_below_target() {
        // 2 cores at 1900 total: 1_000_000 / 1901 = 526 < 1000.
        let i = inputs(2, 1900, 0, MAX_LOAD, 0);
        assert_eq!(predicted_qof(2, 1900), 526);
        assert_eq!(decide(&i, Some(1), None), Decision::Hold);
    }

    #[test]
    fn wakes_under_heavy_load_and_backlog() {
        // 20 tasks / 2 cores = 10 > 1000 / 501.
        let i = inputs(2, 900, 20, 500, 2);
        assert!(should_wake(&i));
        assert_eq!(decide(&i, None, Some(5)), Decision::Wake(5));
    }

    #[test]
    fn park_checked_before_wake() {
        // The same inputs also clear the park rule: 1_000_000 / 901 = 1109 >= 500.
        let i = inputs(2, 900, 20, 500, 2);
        assert!(should_park(&i));
        assert_eq!(decide(&i, Some(1), Some(5)), Decision::Park(1));
    }

    #[test]
    fn no_wake_without_backlog() {
        // 2 tasks / 2 cores = 1, threshold 1000 / 501 = 1: not strictly greater.
        let i = inputs(2, 1900, 2, 500, 1);
        assert!(!should_wake(&i));
    }

    #[test]
    fn no_wake_at_load_limit() {
        let i = inputs(1, HIGH_LOAD_LIMIT, 100, MAX_LOAD, 1);
        assert!(!should_wake(&i));
        let i = inputs(1, HIGH_LOAD_LIMIT + 1, 100, MAX_LOAD, 1);
        assert!(should_wake(&i));
    }

    #[test]
    fn no_wake_without_parked_cores() {
        let i = inputs(2, 1900, 50, 1000, 0);
        assert_eq!(decide(&i, None, None), Decision::Hold);
    }

    #[test]
    fn zero_cores_holds() {
        let i = inputs(0, 0, 10, 0, 1);
        assert_eq!(decide(&i, None, Some(1)), Decision::Hold);
    }

    #[test]
    fn park_without_candidate_falls_through() {
        // target 0 parks whenever possible; the only other core is quarantined.
        let i = inputs(2, 1900, 3000, 0, 1);
        assert!(should_park(&i));
        assert_eq!(decide(&i, None, Some(3)), Decision::Wake(3));
    }
}
