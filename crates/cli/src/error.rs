//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ContractError),

    /// A command line override has an unusable value
    #[error("Invalid value for {flag}: {message}")]
    InvalidOverride { flag: &'static str, message: String },

    /// The campaign task did not complete
    #[error("Campaign execution failed: {message}")]
    CampaignExecution { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_override(flag: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            flag,
            message: message.into(),
        }
    }

    pub fn campaign_execution(message: impl Into<String>) -> Self {
        Self::CampaignExecution {
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
