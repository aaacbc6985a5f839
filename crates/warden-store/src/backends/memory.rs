//! In-memory reference store

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use warden_config::{ProjectName, Revision};

use crate::commit::Commit;
use crate::errors::{Result, StoreError};
use crate::refs::{validate_ref_name, RefStore, StoredRef};

#[derive(Debug)]
struct MemoryProject {
    head: String,
    refs: BTreeMap<String, Revision>,
    objects: HashMap<Revision, Commit>,
}

impl MemoryProject {
    fn commit(&self, project: &ProjectName, revision: &Revision) -> Result<&Commit> {
        self.objects
            .get(revision)
            .ok_or_else(|| StoreError::corrupt(project, format!("missing commit {revision}")))
    }
}

/// In-memory reference store for tests and embedded use
///
/// The outer lock guards the project table; each project has its own mutex
/// so writes to different projects never contend.
#[derive(Debug, Default)]
pub struct MemoryRefStore {
    projects: RwLock<HashMap<ProjectName, Arc<Mutex<MemoryProject>>>>,
}

impl MemoryRefStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn project(&self, project: &ProjectName) -> Result<Arc<Mutex<MemoryProject>>> {
        self.projects
            .read()
            .get(project)
            .cloned()
            .ok_or_else(|| StoreError::ProjectNotFound {
                project: project.clone(),
            })
    }
}

impl RefStore for MemoryRefStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn init_project(&self, project: &ProjectName, head_target: &str) -> Result<()> {
        validate_ref_name(head_target)?;
        let mut projects = self.projects.write();
        if projects.contains_key(project) {
            return Err(StoreError::NameConflict {
                project: project.clone(),
            });
        }
        projects.insert(
            project.clone(),
            Arc::new(Mutex::new(MemoryProject {
                head: head_target.to_string(),
                refs: BTreeMap::new(),
                objects: HashMap::new(),
            })),
        );
        Ok(())
    }

    fn project_exists(&self, project: &ProjectName) -> Result<bool> {
        Ok(self.projects.read().contains_key(project))
    }

    fn list_projects(&self) -> Result<Vec<ProjectName>> {
        let mut names: Vec<_> = self.projects.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn head(&self, project: &ProjectName) -> Result<String> {
        Ok(self.project(project)?.lock().head.clone())
    }

    fn read_ref(&self, project: &ProjectName, ref_name: &str) -> Result<Option<StoredRef>> {
        validate_ref_name(ref_name)?;
        let handle = self.project(project)?;
        let state = handle.lock();
        let Some(revision) = state.refs.get(ref_name).copied() else {
            return Ok(None);
        };
        let content = state.commit(project, &revision)?.content.clone();
        Ok(Some(StoredRef { revision, content }))
    }

    fn write_ref(
        &self,
        project: &ProjectName,
        ref_name: &str,
        expected: Option<&Revision>,
        content: Vec<u8>,
    ) -> Result<Revision> {
        validate_ref_name(ref_name)?;
        let handle = self.project(project)?;
        let mut state = handle.lock();

        let actual = state.refs.get(ref_name).copied();
        if actual.as_ref() != expected {
            return Err(StoreError::StaleRevision {
                project: project.clone(),
                ref_name: ref_name.to_string(),
                expected: expected.copied(),
                actual,
            });
        }

        let commit = Commit::new(actual, content);
        let revision = commit.id();
        state.objects.insert(revision, commit);
        state.refs.insert(ref_name.to_string(), revision);
        Ok(revision)
    }

    fn delete_ref(&self, project: &ProjectName, ref_name: &str) -> Result<bool> {
        validate_ref_name(ref_name)?;
        let handle = self.project(project)?;
        let removed = handle.lock().refs.remove(ref_name).is_some();
        Ok(removed)
    }

    fn list_refs(&self, project: &ProjectName) -> Result<Vec<String>> {
        let handle = self.project(project)?;
        let refs = handle.lock().refs.keys().cloned().collect();
        Ok(refs)
    }

    fn history(&self, project: &ProjectName, ref_name: &str) -> Result<Vec<Revision>> {
        validate_ref_name(ref_name)?;
        let handle = self.project(project)?;
        let state = handle.lock();
        let mut next = state.refs.get(ref_name).copied();
        let mut revisions = Vec::new();
        while let Some(revision) = next {
            next = state.commit(project, &revision)?.parent;
            revisions.push(revision);
        }
        Ok(revisions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &str) -> ProjectName {
        ProjectName::new(value).unwrap()
    }

    #[test]
    fn write_requires_expected_revision() {
        let store = MemoryRefStore::new();
        let project = name("p");
        store.init_project(&project, "refs/heads/master").unwrap();

        let first = store.write_ref(&project, "refs/meta/config", None, b"a".to_vec()).unwrap();
        let stale = store.write_ref(&project, "refs/meta/config", None, b"b".to_vec());
        assert!(matches!(stale, Err(StoreError::StaleRevision { actual: Some(rev), .. }) if rev == first));

        let second = store
            .write_ref(&project, "refs/meta/config", Some(&first), b"b".to_vec())
            .unwrap();
        assert_eq!(store.history(&project, "refs/meta/config").unwrap(), vec![second, first]);
    }

    #[test]
    fn unknown_project_is_not_found() {
        let store = MemoryRefStore::new();
        let err = store.read_ref(&name("nope"), "refs/meta/config").unwrap_err();
        assert!(err.is_not_found());
    }
}
