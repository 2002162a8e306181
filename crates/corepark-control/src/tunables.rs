//! Runtime-adjustable controller parameters.
//!
//! Each value is an independent atomic; a write becomes visible at the
//! start of the next control pass.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use corepark_core::config::ControllerConfig;
use corepark_core::MAX_LOAD;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TunableError {
    #[error("target_qof must be <= {max}, got {0}", max = MAX_LOAD)]
    QofOutOfRange(u32),

    #[error("period_ms must be > 0")]
    ZeroPeriod,

    #[error("smoothing_coefficient must be >= 1")]
    ZeroCoefficient,
}

/// Point-in-time copy of all tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunablesSnapshot {
    pub target_qof: u32,
    pub period_ms: u32,
    pub smoothing_coefficient: u32,
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunablesUpdate {
    pub target_qof: Option<u32>,
    pub period_ms: Option<u32>,
    pub smoothing_coefficient: Option<u32>,
}

#[derive(Debug)]
pub struct Tunables {
    target_qof: AtomicU32,
    period_ms: AtomicU32,
    smoothing_coefficient: AtomicU32,
}

impl Tunables {
    pub fn new(target_qof: u32, period_ms: u32, smoothing_coefficient: u32) -> Result<Self, TunableError> {
        check_qof(target_qof)?;
        check_period(period_ms)?;
        check_coefficient(smoothing_coefficient)?;
        Ok(Self {
            target_qof: AtomicU32::new(target_qof),
            period_ms: AtomicU32::new(period_ms),
            smoothing_coefficient: AtomicU32::new(smoothing_coefficient),
        })
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self, TunableError> {
        Self::new(config.target_qof, config.period_ms, config.smoothing_coefficient)
    }

    pub fn target_qof(&self) -> u32 {
        self.target_qof.load(Ordering::Relaxed)
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms.load(Ordering::Relaxed)
    }

    pub fn smoothing_coefficient(&self) -> u32 {
        self.smoothing_coefficient.load(Ordering::Relaxed)
    }

    pub fn set_target_qof(&self, value: u32) -> Result<(), TunableError> {
        check_qof(value)?;
        self.target_qof.store(value, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_period_ms(&self, value: u32) -> Result<(), TunableError> {
        check_period(value)?;
        self.period_ms.store(value, Ordering::Relaxed);
        Ok(())
    }

    pub fn set_smoothing_coefficient(&self, value: u32) -> Result<(), TunableError> {
        check_coefficient(value)?;
        self.smoothing_coefficient.store(value, Ordering::Relaxed);
        Ok(())
    }

    pub fn snapshot(&self) -> TunablesSnapshot {
        TunablesSnapshot {
            target_qof: self.target_qof(),
            period_ms: self.period_ms(),
            smoothing_coefficient: self.smoothing_coefficient(),
        }
    }

    /// Validate every field of `update`, then store them. Nothing is
    /// written if any field is invalid.
    pub fn apply(&self, update: TunablesUpdate) -> Result<TunablesSnapshot, TunableError> {
        if let Some(v) = update.target_qof {
            check_qof(v)?;
        }
        if let Some(v) = update.period_ms {
            check_period(v)?;
        }
        if let Some(v) = update.smoothing_coefficient {
            check_coefficient(v)?;
        }

        if let Some(v) = update.target_qof {
            self.target_qof.store(v, Ordering::Relaxed);
        }
        if let Some(v) = update.period_ms {
            self.period_ms.store(v, Ordering::Relaxed);
        }
        if let Some(v) = update.smoothing_coefficient {
            self.smoothing_coefficient.store(v, Ordering::Relaxed);
        }
        Ok(self.snapshot())
    }
}

fn check_qof(value: u32) -> Result<(), TunableError> {
    if value > MAX_LOAD {
        return Err(TunableError::QofOutOfRange(value));
    }
    Ok(())
}

fn check_period(value: u32) -> Result<(), TunableError> {
    if value == 0 {
        return Err(TunableError::ZeroPeriod);
    }
    Ok(())
}

fn check_coefficient(value: u32) -> Result<(), TunableError> {
    if value == 0 {
        return Err(TunableError::ZeroCoefficient);
    }
    Ok(())
}
