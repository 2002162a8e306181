//! Error types for the core registry.

use corepark_core::CoreId;
use thiserror::Error;

use crate::registry::Membership;

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry contract violations. These indicate a race or a logic error in
/// the caller, never a platform failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("core {0} is already managed")]
    AlreadyManaged(CoreId),

    #[error("core {0} is not managed")]
    NotManaged(CoreId),

    #[error("core {0} not found")]
    NotFound(CoreId),

    #[error("core {core} is not {expected}")]
    WrongState { core: CoreId, expected: Membership },

    #[error("core {0} is the primary core")]
    PrimaryCore(CoreId),
}
