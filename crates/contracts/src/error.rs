//! Layered error definitions
//!
//! Categorized by source: config / device / lifecycle

use std::fmt;

use thiserror::Error;

use crate::{SensorOption, StreamKind};

/// Target lifecycle stage, used to tag lifecycle failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Open,
    Start,
    Stop,
    Close,
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            LifecycleStage::Open => "open",
            LifecycleStage::Start => "start",
            LifecycleStage::Stop => "stop",
            LifecycleStage::Close => "close",
        };
        f.write_str(stage)
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Device Errors =====
    /// Device has no sensor for the stream kind
    #[error("no {kind} sensor available: {message}")]
    TargetUnavailable { kind: StreamKind, message: String },

    /// Option not exposed by the sensor
    #[error("sensor '{target}' does not support option {option}")]
    OptionUnsupported { target: String, option: SensorOption },

    // ===== Lifecycle Errors =====
    /// open/start/stop/close failed
    #[error("sensor '{target}' failed to {stage}: {message}")]
    Lifecycle {
        target: String,
        stage: LifecycleStage,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create target unavailable error
    pub fn target_unavailable(kind: StreamKind, message: impl Into<String>) -> Self {
        Self::TargetUnavailable {
            kind,
            message: message.into(),
        }
    }

    /// Create lifecycle error
    pub fn lifecycle(
        target: impl Into<String>,
        stage: LifecycleStage,
        message: impl Into<String>,
    ) -> Self {
        Self::Lifecycle {
            target: target.into(),
            stage,
            message: message.into(),
        }
    }
}
