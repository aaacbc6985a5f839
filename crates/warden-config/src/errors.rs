//! Error types for configuration documents and access rules

use thiserror::Error;

/// Errors raised while parsing or interpreting a project configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The document text could not be parsed
    #[error("Malformed document at line {line}: {message}")]
    MalformedDocument {
        /// 1-based line number where parsing failed
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A document entry cannot be mapped to a permission rule
    #[error("Malformed permission in [{section} \"{subsection}\"] {key} = {value:?}: {reason}")]
    MalformedPermission {
        /// Section holding the entry (normally `access`)
        section: String,
        /// Reference pattern the entry was stored under
        subsection: String,
        /// Permission name
        key: String,
        /// Raw value that failed to parse
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// A project name failed validation
    #[error("Invalid project name {name:?}: {reason}")]
    InvalidProjectName {
        /// Rejected name
        name: String,
        /// Why the name was rejected
        reason: &'static str,
    },

    /// A revision identifier could not be decoded
    #[error("Invalid revision {value:?}")]
    InvalidRevision {
        /// Rejected input
        value: String,
    },

    /// A rule under construction cannot be stored
    #[error("Invalid permission rule for {action}: {reason}")]
    InvalidRule {
        /// Permission name of the rule under construction
        action: String,
        /// Why the rule was rejected
        reason: String,
    },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

impl ConfigError {
    /// Create a malformed document error for the given line
    pub fn malformed_document(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedDocument {
            line,
            message: message.into(),
        }
    }

    /// Stable identifier for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedDocument { .. } => "malformed_document",
            Self::MalformedPermission { .. } => "malformed_permission",
            Self::InvalidProjectName { .. } => "invalid_project_name",
            Self::InvalidRevision { .. } => "invalid_revision",
            Self::InvalidRule { .. } => "invalid_rule",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_permission_message_names_the_entry() {
        let err = ConfigError::MalformedPermission {
            section: "access".to_string(),
            subsection: "refs/foo".to_string(),
            key: "abandon".to_string(),
            value: "group".to_string(),
            reason: "missing group reference".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("[access \"refs/foo\"]"));
        assert!(text.contains("abandon"));
        assert_eq!(err.code(), "malformed_permission");
    }
}
