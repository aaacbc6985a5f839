//! Store errors

use std::path::PathBuf;

use thiserror::Error;
use warden_config::{ConfigError, ProjectName, Revision};

/// Errors raised by reference stores and the project store
#[derive(Debug, Error)]
pub enum StoreError {
    /// A project with this name already exists
    #[error("Project {project} already exists")]
    NameConflict {
        /// Conflicting name
        project: ProjectName,
    },

    /// The project does not exist
    #[error("Project {project} not found")]
    ProjectNotFound {
        /// Missing project
        project: ProjectName,
    },

    /// The reference does not exist
    #[error("Reference {ref_name} not found in {project}")]
    RefNotFound {
        /// Project that was searched
        project: ProjectName,
        /// Missing reference
        ref_name: String,
    },

    /// The reference moved since the caller read it
    #[error("Stale revision for {ref_name} in {project}: expected {}, found {}", display_rev(.expected), display_rev(.actual))]
    StaleRevision {
        /// Project holding the reference
        project: ProjectName,
        /// Reference that was updated
        ref_name: String,
        /// Revision the caller based its write on
        expected: Option<Revision>,
        /// Revision the reference points to now
        actual: Option<Revision>,
    },

    /// A reference name failed validation
    #[error("Invalid reference name {ref_name:?}: {reason}")]
    InvalidRefName {
        /// Rejected name
        ref_name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Another process holds the lock file for this reference
    #[error("Reference {ref_name} in {project} is locked by another writer")]
    LockHeld {
        /// Project holding the reference
        project: ProjectName,
        /// Locked reference
        ref_name: String,
    },

    /// The stored document could not be interpreted
    #[error("Invalid configuration on {ref_name} in {project}: {source}")]
    Document {
        /// Project the document belongs to
        project: ProjectName,
        /// Reference the document was read from
        ref_name: String,
        /// Underlying parse error
        #[source]
        source: ConfigError,
    },

    /// Stored repository data is inconsistent
    #[error("Corrupt repository data for {project}: {message}")]
    Corrupt {
        /// Affected project
        project: ProjectName,
        /// What was inconsistent
        message: String,
    },

    /// Filesystem operation failed
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Name or identifier validation failed
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

fn display_rev(rev: &Option<Revision>) -> String {
    rev.map_or_else(|| "<none>".to_string(), |rev| rev.short())
}

impl StoreError {
    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a corruption error
    pub fn corrupt(project: &ProjectName, message: impl Into<String>) -> Self {
        Self::Corrupt {
            project: project.clone(),
            message: message.into(),
        }
    }

    /// True for `ProjectNotFound` and `RefNotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProjectNotFound { .. } | Self::RefNotFound { .. })
    }

    /// Stable identifier for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::NameConflict { .. } => "name_conflict",
            Self::ProjectNotFound { .. } | Self::RefNotFound { .. } => "not_found",
            Self::StaleRevision { .. } => "stale_revision",
            Self::InvalidRefName { .. } => "invalid_ref_name",
            Self::LockHeld { .. } => "lock_held",
            Self::Document { source, .. } => source.code(),
            Self::Corrupt { .. } => "corrupt",
            Self::Io { .. } => "io",
            Self::Config(source) => source.code(),
        }
    }
}
