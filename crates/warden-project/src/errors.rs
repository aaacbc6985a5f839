//! Project-level errors

use std::path::PathBuf;

use thiserror::Error;
use warden_config::{ConfigError, ProjectName, Revision};
use warden_store::StoreError;

/// Errors raised by the cache, update transactions and the operations facade
#[derive(Debug, Error)]
pub enum ProjectError {
    /// Another writer committed to the project after this transaction opened
    #[error(
        "Concurrent modification of {project}: configuration moved since {}",
        .base.map_or_else(|| "<none>".to_string(), |rev| rev.short())
    )]
    ConcurrentModification {
        /// Project being updated
        project: ProjectName,
        /// Revision the transaction was based on
        base: Option<Revision>,
        /// Underlying stale-write rejection
        #[source]
        source: StoreError,
    },

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid name or rule
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for project operations
pub type Result<T> = std::result::Result<T, ProjectError>;

impl ProjectError {
    /// True when the error is a lost optimistic-concurrency race
    pub fn is_concurrent_modification(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Stable identifier for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::Store(source) => source.code(),
            Self::Config(source) => source.code(),
        }
    }
}

/// Errors loading or validating [`EngineConfig`](crate::config::EngineConfig)
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("Failed to read settings file {}: {source}", .path.display())]
    Read {
        /// File that was read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The settings text is not valid TOML for this schema
    #[error("Invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be applied
    #[error("Invalid value for {variable}: {message}")]
    Environment {
        /// Variable name
        variable: String,
        /// What was wrong with it
        message: String,
    },

    /// A setting is out of range or inconsistent
    #[error("Invalid setting {field}: {message}")]
    Invalid {
        /// Dotted field path
        field: &'static str,
        /// What was wrong with it
        message: String,
    },

    /// Opening the configured storage backend failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }

    /// Stable identifier for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "settings_read",
            Self::Parse(_) => "settings_parse",
            Self::Environment { .. } => "settings_env",
            Self::Invalid { .. } => "settings_invalid",
            Self::Store(source) => source.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_modification_reports_base() {
        let project = ProjectName::new("p").unwrap();
        let base = Revision::digest(b"base");
        let err = ProjectError::ConcurrentModification {
            project: project.clone(),
            base: Some(base),
            source: StoreError::StaleRevision {
                project,
                ref_name: "refs/meta/config".to_string(),
                expected: Some(base),
                actual: None,
            },
        };
        assert!(err.is_concurrent_modification());
        assert_eq!(err.code(), "concurrent_modification");
        assert!(err.to_string().contains(&base.short()));
    }
}
