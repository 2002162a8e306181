//! Controller error types.

use thiserror::Error;

use crate::tunables::TunableError;

/// Errors surfaced by controller operations.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("registry error: {0}")]
    Registry(#[from] corepark_registry::RegistryError),

    #[error("platform error: {0}")]
    Platform(#[from] corepark_core::PlatformError),

    #[error("invalid tunable: {0}")]
    Tunable(#[from] TunableError),

    #[error("blocking platform task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type ControlResult<T> = Result<T, ControlError>;
