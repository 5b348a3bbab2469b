//! Provider configuration
//!
//! Loaded from a JSON file; every field is optional:
//!
//! ```json
//! {
//!   "region": "eu-west-1",
//!   "profile": "kafka-admin",
//!   "timeouts": { "stack_create": 3600, "connector_delete": 600 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::OperationKind;
use crate::utils::normalize_region;

/// Largest accepted timeout override, in seconds (one week)
pub const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Per-operation timeout overrides, in seconds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub stack_create: Option<u64>,
    pub stack_update: Option<u64>,
    pub stack_delete: Option<u64>,
    pub change_set_create: Option<u64>,
    pub stack_set_operation: Option<u64>,
    pub type_registration: Option<u64>,
    pub connector_create: Option<u64>,
    pub connector_update: Option<u64>,
    pub connector_delete: Option<u64>,
}

impl Timeouts {
    fn override_for(&self, kind: OperationKind) -> Option<u64> {
        match kind {
            OperationKind::StackCreate => self.stack_create,
            OperationKind::StackUpdate => self.stack_update,
            OperationKind::StackDelete => self.stack_delete,
            OperationKind::ChangeSetCreate => self.change_set_create,
            OperationKind::StackSetOperation => self.stack_set_operation,
            OperationKind::TypeRegistration => self.type_registration,
            OperationKind::ConnectorCreate => self.connector_create,
            OperationKind::ConnectorUpdate => self.connector_update,
            OperationKind::ConnectorDelete => self.connector_delete,
        }
    }

    /// Timeout for `kind`: the override if set, else the kind's default
    pub fn get(&self, kind: OperationKind) -> Duration {
        self.override_for(kind)
            .map(Duration::from_secs)
            .unwrap_or_else(|| kind.default_timeout())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub region: Option<String>,
    /// Named profile from the shared AWS config files
    pub profile: Option<String>,
    pub timeouts: Timeouts,
}

impl ProviderConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;
        let config: ProviderConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(region) = &self.region
            && region.trim().is_empty()
        {
            return Err(ConfigError::Invalid("region must not be empty".to_string()));
        }
        for kind in OperationKind::ALL {
            match self.timeouts.override_for(kind) {
                Some(0) => {
                    return Err(ConfigError::Invalid(format!(
                        "timeouts.{} must be greater than zero",
                        kind.name()
                    )));
                }
                Some(secs) if secs > MAX_TIMEOUT_SECS => {
                    return Err(ConfigError::Invalid(format!(
                        "timeouts.{} must be at most {} seconds",
                        kind.name(),
                        MAX_TIMEOUT_SECS
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Region in AWS form, e.g. "ap_northeast_1" becomes "ap-northeast-1".
    /// `None` leaves resolution to the SDK (environment, then profile).
    pub fn region(&self) -> Option<String> {
        self.region.as_deref().map(normalize_region)
    }

    pub fn timeout(&self, kind: OperationKind) -> Duration {
        self.timeouts.get(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_without_overrides() {
        let config = ProviderConfig::default();
        assert_eq!(config.region(), None);
        assert_eq!(
            config.timeout(OperationKind::StackCreate),
            Duration::from_secs(1800)
        );
        assert_eq!(
            config.timeout(OperationKind::ConnectorDelete),
            Duration::from_secs(1200)
        );
    }

    #[test]
    fn loads_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"region": "ap_northeast_1", "timeouts": {{"stack_create": 3600}}}}"#
        )
        .unwrap();

        let config = ProviderConfig::from_file(file.path()).unwrap();
        assert_eq!(config.region().as_deref(), Some("ap-northeast-1"));
        assert_eq!(
            config.timeout(OperationKind::StackCreate),
            Duration::from_secs(3600)
        );
        assert_eq!(
            config.timeout(OperationKind::StackUpdate),
            Duration::from_secs(1800)
        );
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ProviderConfig {
            timeouts: Timeouts {
                connector_update: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: timeouts.connector_update must be greater than zero"
        );
    }

    #[test]
    fn rejects_timeout_beyond_one_week() {
        let config = ProviderConfig {
            timeouts: Timeouts {
                stack_create: Some(u64::MAX),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: timeouts.stack_create must be at most 604800 seconds"
        );

        let config = ProviderConfig {
            timeouts: Timeouts {
                stack_create: Some(MAX_TIMEOUT_SECS),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_blank_region() {
        let config = ProviderConfig::default().with_region("  ");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_fields_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provider.json");
        std::fs::write(&path, r#"{"regoin": "eu-west-1"}"#).unwrap();

        let err = ProviderConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ProviderConfig::from_file(Path::new("/nonexistent/provider.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
