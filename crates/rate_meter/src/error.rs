//! Measurement error types

use std::time::Duration;

use contracts::{ContractError, LifecycleStage, StreamProfile};
use thiserror::Error;

/// Failure of a single measurement run
///
/// Any of these means the run produced no trustworthy frame count.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// Measurement window must be non-zero
    #[error("invalid measurement window: {0:?}")]
    InvalidWindow(Duration),

    /// The target rejected the profile or is busy
    #[error("failed to open '{target}' with {profile}: {source}")]
    Open {
        target: String,
        profile: StreamProfile,
        #[source]
        source: ContractError,
    },

    /// Delivery could not be started
    #[error("failed to start '{target}': {source}")]
    Start {
        target: String,
        #[source]
        source: ContractError,
    },

    /// Stop or close failed after measuring
    #[error("teardown of '{target}' failed at {stage}, frame count discarded: {source}")]
    Teardown {
        target: String,
        stage: LifecycleStage,
        #[source]
        source: ContractError,
    },
}

impl MeasureError {
    /// Lifecycle stage the failure belongs to, if any
    pub fn stage(&self) -> Option<LifecycleStage> {
        match self {
            MeasureError::InvalidWindow(_) => None,
            MeasureError::Open { .. } => Some(LifecycleStage::Open),
            MeasureError::Start { .. } => Some(LifecycleStage::Start),
            MeasureError::Teardown { stage, .. } => Some(*stage),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, MeasureError>;
