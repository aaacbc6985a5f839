//! Store and operations fixtures

use std::sync::Arc;

use tempfile::TempDir;
use warden_config::{ConfigDocument, GroupReference, PermissionKind, PermissionRule, ProjectName};
use warden_project::{CacheConfig, ProjectOperations};
use warden_store::{FilesystemRefStore, MemoryRefStore, ProjectStore, RefStore};

/// Parse a project name, panicking on invalid input
pub fn project_name(name: &str) -> ProjectName {
    ProjectName::new(name).unwrap()
}

/// Parse a document, panicking on invalid input
pub fn document(text: &str) -> ConfigDocument {
    ConfigDocument::parse(text).unwrap()
}

/// Build a rule for `action` on `ref_pattern`
pub fn rule(
    kind: PermissionKind,
    action: &str,
    ref_pattern: &str,
    group: GroupReference,
) -> PermissionRule {
    let builder = match kind {
        PermissionKind::Allow => PermissionRule::allow(action),
        PermissionKind::Deny => PermissionRule::deny(action),
        PermissionKind::Block => PermissionRule::block(action),
    };
    builder.ref_pattern(ref_pattern).group(group).build().unwrap()
}

/// Empty in-memory reference store
pub fn memory_ref_store() -> Arc<dyn RefStore> {
    Arc::new(MemoryRefStore::new())
}

/// Project store over a fresh in-memory backend
pub fn memory_store() -> ProjectStore {
    ProjectStore::new(memory_ref_store())
}

/// Operations over a fresh in-memory backend with default cache settings
pub fn memory_operations() -> ProjectOperations {
    ProjectOperations::new(memory_store(), CacheConfig::default())
}

/// Filesystem store in a temporary directory, removed when dropped
pub struct TempStore {
    /// Keeps the directory alive
    pub dir: TempDir,
    /// Reference store rooted in `dir`
    pub refs: Arc<FilesystemRefStore>,
}

impl TempStore {
    /// Create a store in a new temporary directory
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let refs = Arc::new(FilesystemRefStore::open(dir.path()).unwrap());
        Self { dir, refs }
    }

    /// Project store over this backend
    pub fn project_store(&self) -> ProjectStore {
        ProjectStore::new(self.refs.clone())
    }

    /// Operations over this backend
    pub fn operations(&self) -> ProjectOperations {
        ProjectOperations::new(self.project_store(), CacheConfig::default())
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}
