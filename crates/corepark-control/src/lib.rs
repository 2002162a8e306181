//! corepark-control — the adaptive core-parking controller.
//!
//! Each pass of the control loop drains pending topology events, samples
//! and smooths per-core load, and applies at most one structural change:
//! park the least-loaded core, wake the earliest-parked one, or hold.
//!
//! # Decision Rule
//!
//! ```text
//! predicted_qof = MAX_LOAD * (nr_cores - 1) * MAX_LOAD / (sum_smoothed_load + 1)
//!
//! if nr_cores > 1 and predicted_qof >= target_qof:
//!     park least-loaded non-primary core
//! elif parked > 0 and sum_smoothed_load > HIGH_LOAD_LIMIT
//!      and running_tasks / nr_cores > MAX_LOAD / (target_qof + 1):
//!     wake earliest-parked core
//! ```
//!
//! There is no hysteresis band: load sitting on a threshold can park and
//! wake on alternate passes.
//!
//! # Architecture
//!
//! ```text
//! Controller
//!   ├── Mutex<Registry>         (shared with reconcile())
//!   ├── Tunables                (atomics, read once per pass)
//!   ├── mpsc<TopologyEvent>     (drained at the start of each pass)
//!   └── control task            (run_cycle → sleep, until stop())
//! ```

pub mod controller;
pub mod decision;
pub mod error;
pub mod reconciler;
pub mod selector;
pub mod tunables;

pub use controller::{
    Controller, ControllerStatus, CycleAction, CycleReport, Platform, StopReport, TopologySender,
};
pub use decision::{decide, predicted_qof, Decision, DecisionInputs};
pub use error::{ControlError, ControlResult};
pub use reconciler::{ReconcileOutcome, Reconciler};
pub use selector::{pick_park_candidate, pick_wake_candidate};
pub use tunables::{TunableError, Tunables, TunablesSnapshot, TunablesUpdate};
