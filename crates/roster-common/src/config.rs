//! Global configuration model for the roster tooling.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};

/// Root configuration for listing and state loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Path to the collaborator's container state file.
    pub state_file: PathBuf,
    /// Records evaluated between two cancellation checks while listing.
    pub cancel_check_interval: usize,
    /// Limit applied when a listing does not ask for one (0 = unlimited).
    pub default_limit: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            state_file: crate::constants::default_state_file(),
            cancel_check_interval: crate::constants::DEFAULT_CANCEL_CHECK_INTERVAL,
            default_limit: 0,
        }
    }
}

impl RosterConfig {
    /// Loads a configuration file, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds an invalid value.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| RosterError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if `cancel_check_interval` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.cancel_check_interval == 0 {
            return Err(RosterError::Config {
                message: "cancel_check_interval must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RosterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_limit, 0);
        assert!(config.state_file.ends_with("state.json"));
    }

    #[test]
    fn load_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, r#"{"default_limit": 5}"#).unwrap();

        let config = RosterConfig::load(&path).unwrap();
        assert_eq!(config.default_limit, 5);
        assert_eq!(
            config.cancel_check_interval,
            crate::constants::DEFAULT_CANCEL_CHECK_INTERVAL
        );
    }

    #[test]
    fn load_rejects_zero_check_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, r#"{"cancel_check_interval": 0}"#).unwrap();

        let err = RosterConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("cancel_check_interval"), "got: {err}");
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = RosterConfig::load(Path::new("/nonexistent/roster.json")).unwrap_err();
        assert!(matches!(err, RosterError::Io { .. }));
    }
}
