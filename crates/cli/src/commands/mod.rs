//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_campaign;
pub use validate::run_validate;

use std::path::Path;

use config_loader::ConfigLoader;
use contracts::CampaignConfig;
use tracing::info;

use crate::error::{CliError, Result};

/// Load the campaign from `path`, or the built-in campaign when absent
pub(crate) fn load_config(path: Option<&Path>) -> Result<CampaignConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::config_not_found(path.display().to_string()));
            }
            info!(config = %path.display(), "Loading configuration");
            Ok(ConfigLoader::load_from_path(path)?)
        }
        None => {
            info!("Using built-in campaign");
            Ok(CampaignConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_config_not_found() {
        let err = load_config(Some(Path::new("/nonexistent/fps.toml"))).unwrap_err();
        assert!(matches!(err, CliError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_no_path_is_builtin() {
        let config = load_config(None).unwrap();
        assert_eq!(config.rates.len(), 6);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[rates]\nrequested_fps = [5]\nmeasurement_secs = []\n")
            .unwrap();
        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }
}
