//! corepark-registry — the controller's view of which cores it manages.
//!
//! Every known core lives in a single table keyed by id and carries a
//! [`Membership`] tag. Parking and waking flip the tag; an entry is only
//! dropped when the core leaves the machine.
//!
//! # Invariants
//!
//! - every entry is either `Online` or `Parked`, never both
//! - an id appears at most once
//! - the primary core is always `Online`
//! - `parked_count()` is derived from the table, so it always matches
//!
//! The registry itself is not synchronized; the controller wraps it in a
//! single mutex shared with the topology reconciler.

pub mod error;
pub mod registry;

pub use error::{RegistryError, RegistryResult};
pub use registry::{ManagedCore, Membership, Registry};
