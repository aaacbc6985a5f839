//! Version-control capability consumed by the project store.
//!
//! A [`RefStore`] keeps named, mutable references per project, each pointing
//! at an immutable commit that carries one payload. The only mutation point is
//! [`RefStore::write_ref`], an atomic compare-and-swap on a single reference.

use serde::{Deserialize, Serialize};
use warden_config::{ProjectName, Revision};

use crate::errors::{Result, StoreError};

/// Symbolic reference naming a project's default branch.
pub const HEAD: &str = "HEAD";

/// Names of the references every project is created with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefLayout {
    /// Branch `HEAD` points to.
    pub default_branch: String,
    /// Reference holding the configuration document.
    pub config_ref: String,
}

impl Default for RefLayout {
    fn default() -> Self {
        Self {
            default_branch: "refs/heads/master".to_string(),
            config_ref: "refs/meta/config".to_string(),
        }
    }
}

impl RefLayout {
    /// Check that both names are valid and distinct.
    pub fn validate(&self) -> Result<()> {
        validate_ref_name(&self.default_branch)?;
        validate_ref_name(&self.config_ref)?;
        if self.default_branch == self.config_ref {
            return Err(StoreError::InvalidRefName {
                ref_name: self.config_ref.clone(),
                reason: "config reference must differ from the default branch",
            });
        }
        Ok(())
    }
}

/// References created for a new project and the revisions they point to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRefs {
    /// Default branch name.
    pub default_branch: String,
    /// Initial (empty) commit on the default branch.
    pub default_branch_revision: Revision,
    /// Config reference name.
    pub config_ref: String,
    /// Initial (empty) commit on the config reference.
    pub config_revision: Revision,
}

/// Payload and revision a reference currently points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRef {
    /// Commit the reference points to.
    pub revision: Revision,
    /// Payload of that commit.
    pub content: Vec<u8>,
}

/// Per-project reference storage.
///
/// Implementations must make `write_ref` linearizable per project: of any set
/// of concurrent writers that pass the same `expected` revision, exactly one
/// succeeds and the others get [`StoreError::StaleRevision`].
pub trait RefStore: Send + Sync {
    /// Short backend name for diagnostics.
    fn backend_name(&self) -> &'static str;

    /// Register a project with `HEAD` pointing at `head_target`.
    ///
    /// Fails with [`StoreError::NameConflict`] if the project exists.
    fn init_project(&self, project: &ProjectName, head_target: &str) -> Result<()>;

    /// True if the project exists.
    fn project_exists(&self, project: &ProjectName) -> Result<bool>;

    /// All projects, sorted by name.
    fn list_projects(&self) -> Result<Vec<ProjectName>>;

    /// Target of the project's `HEAD`.
    fn head(&self, project: &ProjectName) -> Result<String>;

    /// Current payload and revision of a reference; `None` if it does not exist.
    fn read_ref(&self, project: &ProjectName, ref_name: &str) -> Result<Option<StoredRef>>;

    /// Commit `content` on top of `expected` and move the reference to it.
    ///
    /// `expected == None` means the reference must not exist yet.
    fn write_ref(
        &self,
        project: &ProjectName,
        ref_name: &str,
        expected: Option<&Revision>,
        content: Vec<u8>,
    ) -> Result<Revision>;

    /// Delete a reference. Returns false if it did not exist.
    fn delete_ref(&self, project: &ProjectName, ref_name: &str) -> Result<bool>;

    /// Names of all existing references (excluding `HEAD`), sorted.
    fn list_refs(&self, project: &ProjectName) -> Result<Vec<String>>;

    /// Revisions reachable from the reference, newest first.
    fn history(&self, project: &ProjectName, ref_name: &str) -> Result<Vec<Revision>>;

    /// Create a project with an empty default branch and an empty config
    /// reference.
    fn create_project_refs(&self, project: &ProjectName, layout: &RefLayout) -> Result<ProjectRefs> {
        layout.validate()?;
        self.init_project(project, &layout.default_branch)?;
        let default_branch_revision =
            self.write_ref(project, &layout.default_branch, None, Vec::new())?;
        let config_revision = self.write_ref(project, &layout.config_ref, None, Vec::new())?;

        Ok(ProjectRefs {
            default_branch: layout.default_branch.clone(),
            default_branch_revision,
            config_ref: layout.config_ref.clone(),
            config_revision,
        })
    }
}

/// Validate a writable reference name (`refs/...`).
pub fn validate_ref_name(ref_name: &str) -> Result<()> {
    let reason = if !ref_name.starts_with("refs/") {
        Some("must start with 'refs/'")
    } else if ref_name.ends_with('/') || ref_name.ends_with(".lock") {
        Some("must not end with '/' or '.lock'")
    } else if ref_name
        .split('/')
        .any(|part| part.is_empty() || part.starts_with('.'))
    {
        Some("empty or dot-prefixed component")
    } else if ref_name
        .chars()
        .any(|c| c.is_control() || c == ' ' || matches!(c, '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
    {
        Some("contains a forbidden character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StoreError::InvalidRefName {
            ref_name: ref_name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_valid() {
        RefLayout::default().validate().unwrap();
    }

    #[test]
    fn layout_refs_must_differ() {
        let layout = RefLayout {
            default_branch: "refs/meta/config".to_string(),
            config_ref: "refs/meta/config".to_string(),
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn ref_name_rules() {
        for good in ["refs/heads/master", "refs/meta/config", "refs/heads/stable-2.15"] {
            assert!(validate_ref_name(good).is_ok(), "{good}");
        }
        for bad in ["HEAD", "refs/", "refs//x", "refs/heads/.hidden", "refs/x.lock", "refs/a b", "refs/*"] {
            assert!(validate_ref_name(bad).is_err(), "{bad}");
        }
    }
}
