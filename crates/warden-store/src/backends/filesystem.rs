//! Filesystem reference store
//!
//! Layout under the root directory, one bare-repository-like directory per
//! project:
//!
//! ```text
//! <root>/<project>.git/HEAD                  "ref: refs/heads/master"
//! <root>/<project>.git/refs/meta/config      hex revision
//! <root>/<project>.git/objects/ab/cdef...    JSON commit object
//! ```
//!
//! A reference is updated by creating `<ref>.lock` exclusively, writing the
//! new revision into it and renaming it over the reference.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use warden_config::{ProjectName, Revision};

use crate::commit::Commit;
use crate::errors::{Result, StoreError};
use crate::refs::{validate_ref_name, RefStore, StoredRef, HEAD};

const PROJECT_SUFFIX: &str = ".git";
const LOCK_SUFFIX: &str = ".lock";
const SYMREF_PREFIX: &str = "ref: ";

/// Reference store persisting projects as directories on the local filesystem
#[derive(Debug)]
pub struct FilesystemRefStore {
    root: PathBuf,
    // Serializes writers within this process; the lock files cover other processes.
    // Entries exist only while a write to that project is in progress.
    writers: Mutex<HashMap<ProjectName, Arc<Mutex<()>>>>,
}

impl FilesystemRefStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::io(&root, e))?;
        Ok(Self {
            root,
            writers: Mutex::new(HashMap::new()),
        })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn project_dir(&self, project: &ProjectName) -> PathBuf {
        self.root.join(format!("{project}{PROJECT_SUFFIX}"))
    }

    fn existing_project_dir(&self, project: &ProjectName) -> Result<PathBuf> {
        let dir = self.project_dir(project);
        if dir.join(HEAD).is_file() {
            Ok(dir)
        } else {
            Err(StoreError::ProjectNotFound {
                project: project.clone(),
            })
        }
    }

    fn writer<'a>(&'a self, project: &'a ProjectName) -> WriterSlot<'a> {
        let writer = self.writers.lock().entry(project.clone()).or_default().clone();
        WriterSlot {
            store: self,
            project,
            writer,
        }
    }

    fn object_path(dir: &Path, revision: &Revision) -> PathBuf {
        let hex = revision.to_hex();
        dir.join("objects").join(&hex[..2]).join(&hex[2..])
    }

    fn read_revision(project: &ProjectName, path: &Path) -> Result<Option<Revision>> {
        match fs::read_to_string(path) {
            Ok(text) => Revision::from_hex(text.trim()).map(Some).map_err(|_| {
                StoreError::corrupt(project, format!("bad revision in {}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    fn read_commit(project: &ProjectName, dir: &Path, revision: &Revision) -> Result<Commit> {
        let path = Self::object_path(dir, revision);
        let bytes = fs::read(&path).map_err(|e| StoreError::io(&path, e))?;
        let commit = Commit::decode(&bytes)
            .map_err(|e| StoreError::corrupt(project, format!("commit {revision}: {e}")))?;
        if commit.id() != *revision {
            return Err(StoreError::corrupt(
                project,
                format!("commit {revision} does not match its contents"),
            ));
        }
        Ok(commit)
    }

    fn write_commit(project: &ProjectName, dir: &Path, commit: &Commit) -> Result<Revision> {
        let revision = commit.id();
        let path = Self::object_path(dir, &revision);
        let bytes = commit
            .encode()
            .map_err(|e| StoreError::corrupt(project, format!("encoding commit: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        fs::write(&path, bytes).map_err(|e| StoreError::io(&path, e))?;
        Ok(revision)
    }

    fn collect_refs(base: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| StoreError::io(&path, e))?;
            if file_type.is_dir() {
                Self::collect_refs(base, &path, out)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !name.ends_with(LOCK_SUFFIX) {
                    out.push(name);
                }
            }
        }
        Ok(())
    }

    fn collect_projects(&self, dir: &Path, out: &mut Vec<ProjectName>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(dir, e))?;
            let path = entry.path();
            if !entry.file_type().map_err(|e| StoreError::io(&path, e))?.is_dir() {
                continue;
            }
            let is_project = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(PROJECT_SUFFIX))
                && path.join(HEAD).is_file();
            if !is_project {
                self.collect_projects(&path, out)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let name = relative.strip_suffix(PROJECT_SUFFIX).unwrap_or(&relative);
            match ProjectName::new(name) {
                Ok(project) => out.push(project),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unrecognized project directory"),
            }
        }
        Ok(())
    }
}

/// In-process writer mutex of one project. The map entry is dropped with the
/// last slot, so `writers` only holds projects with a write in progress.
struct WriterSlot<'a> {
    store: &'a FilesystemRefStore,
    project: &'a ProjectName,
    writer: Arc<Mutex<()>>,
}

impl Drop for WriterSlot<'_> {
    fn drop(&mut self) {
        let mut writers = self.store.writers.lock();
        // Clones are only taken under the map lock: two owners means the map and us.
        let owned_by_map = writers
            .get(self.project)
            .is_some_and(|writer| Arc::ptr_eq(writer, &self.writer));
        if owned_by_map && Arc::strong_count(&self.writer) == 2 {
            writers.remove(self.project);
        }
    }
}

/// Exclusive `.lock` file for one reference, removed on drop unless committed.
struct RefLock {
    path: PathBuf,
    file: Option<File>,
}

impl RefLock {
    fn acquire(project: &ProjectName, ref_name: &str, ref_path: &Path) -> Result<Self> {
        let mut path = ref_path.as_os_str().to_owned();
        path.push(LOCK_SUFFIX);
        let path = PathBuf::from(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::LockHeld {
                project: project.clone(),
                ref_name: ref_name.to_string(),
            }),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    fn commit(mut self, revision: &Revision, target: &Path) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            writeln!(file, "{}", revision.to_hex()).map_err(|e| StoreError::io(&self.path, e))?;
            file.sync_all().map_err(|e| StoreError::io(&self.path, e))?;
        }
        fs::rename(&self.path, target).map_err(|e| StoreError::io(target, e))?;
        self.path = PathBuf::new();
        Ok(())
    }
}

impl Drop for RefLock {
    fn drop(&mut self) {
        self.file.take();
        if !self.path.as_os_str().is_empty() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "Failed to remove reference lock");
            }
        }
    }
}

impl RefStore for FilesystemRefStore {
    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    fn init_project(&self, project: &ProjectName, head_target: &str) -> Result<()> {
        validate_ref_name(head_target)?;
        let dir = self.project_dir(project);
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::NameConflict {
                    project: project.clone(),
                })
            }
            Err(e) => return Err(StoreError::io(&dir, e)),
        }
        let head = dir.join(HEAD);
        fs::write(&head, format!("{SYMREF_PREFIX}{head_target}\n"))
            .map_err(|e| StoreError::io(&head, e))?;
        debug!(project = %project, path = %dir.display(), "Initialized project directory");
        Ok(())
    }

    fn project_exists(&self, project: &ProjectName) -> Result<bool> {
        Ok(self.project_dir(project).join(HEAD).is_file())
    }

    fn list_projects(&self) -> Result<Vec<ProjectName>> {
        let mut projects = Vec::new();
        self.collect_projects(&self.root, &mut projects)?;
        projects.sort();
        Ok(projects)
    }

    fn head(&self, project: &ProjectName) -> Result<String> {
        let path = self.existing_project_dir(project)?.join(HEAD);
        let text = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        text.trim()
            .strip_prefix(SYMREF_PREFIX)
            .map(str::to_string)
            .ok_or_else(|| StoreError::corrupt(project, "HEAD is not a symbolic reference"))
    }

    fn read_ref(&self, project: &ProjectName, ref_name: &str) -> Result<Option<StoredRef>> {
        validate_ref_name(ref_name)?;
        let dir = self.existing_project_dir(project)?;
        let Some(revision) = Self::read_revision(project, &dir.join(ref_name))? else {
            return Ok(None);
        };
        let commit = Self::read_commit(project, &dir, &revision)?;
        Ok(Some(StoredRef {
            revision,
            content: commit.content,
        }))
    }

    fn write_ref(
        &self,
        project: &ProjectName,
        ref_name: &str,
        expected: Option<&Revision>,
        content: Vec<u8>,
    ) -> Result<Revision> {
        validate_ref_name(ref_name)?;
        let dir = self.existing_project_dir(project)?;
        let ref_path = dir.join(ref_name);

        let slot = self.writer(project);
        let _guard = slot.writer.lock();
        let lock = RefLock::acquire(project, ref_name, &ref_path)?;

        let actual = Self::read_revision(project, &ref_path)?;
        if actual.as_ref() != expected {
            return Err(StoreError::StaleRevision {
                project: project.clone(),
                ref_name: ref_name.to_string(),
                expected: expected.copied(),
                actual,
            });
        }

        let revision = Self::write_commit(project, &dir, &Commit::new(actual, content))?;
        lock.commit(&revision, &ref_path)?;
        Ok(revision)
    }

    fn delete_ref(&self, project: &ProjectName, ref_name: &str) -> Result<bool> {
        validate_ref_name(ref_name)?;
        let dir = self.existing_project_dir(project)?;
        let ref_path = dir.join(ref_name);

        let slot = self.writer(project);
        let _guard = slot.writer.lock();
        let _lock = RefLock::acquire(project, ref_name, &ref_path)?;

        match fs::remove_file(&ref_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&ref_path, e)),
        }
    }

    fn list_refs(&self, project: &ProjectName) -> Result<Vec<String>> {
        let dir = self.existing_project_dir(project)?;
        let mut refs = Vec::new();
        Self::collect_refs(&dir, &dir.join("refs"), &mut refs)?;
        refs.sort();
        Ok(refs)
    }

    fn history(&self, project: &ProjectName, ref_name: &str) -> Result<Vec<Revision>> {
        validate_ref_name(ref_name)?;
        let dir = self.existing_project_dir(project)?;
        let mut next = Self::read_revision(project, &dir.join(ref_name))?;
        let mut revisions = Vec::new();
        while let Some(revision) = next {
            next = Self::read_commit(project, &dir, &revision)?.parent;
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
    fn held_lock_file_rejects_writer() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FilesystemRefStore::open(tmp.path()).unwrap();
        let project = name("locked");
        store.init_project(&project, "refs/heads/master").unwrap();

        let lock_path = store.project_dir(&project).join("refs/meta/config.lock");
        fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
        fs::write(&lock_path, b"").unwrap();

        let err = store
            .write_ref(&project, "refs/meta/config", None, Vec::new())
            .unwrap_err();
        assert_eq!(err.code(), "lock_held");
        // The foreign lock is left alone.
        assert!(lock_path.exists());
    }

    #[test]
    fn stale_write_releases_lock() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FilesystemRefStore::open(tmp.path()).unwrap();
        let project = name("a/b");
        store.init_project(&project, "refs/heads/master").unwrap();
        store.write_ref(&project, "refs/meta/config", None, Vec::new()).unwrap();

        assert!(store.write_ref(&project, "refs/meta/config", None, Vec::new()).is_err());
        assert_eq!(store.list_refs(&project).unwrap(), vec!["refs/meta/config"]);
        assert_eq!(store.list_projects().unwrap(), vec![project]);
    }

    #[test]
    fn writer_slots_are_released_after_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FilesystemRefStore::open(tmp.path()).unwrap();
        let project = name("busy");
        store.init_project(&project, "refs/heads/master").unwrap();

        let first = store.write_ref(&project, "refs/meta/config", None, Vec::new()).unwrap();
        assert!(store.write_ref(&project, "refs/meta/config", None, Vec::new()).is_err());
        store.delete_ref(&project, "refs/meta/config").unwrap();
        assert_ne!(store.write_ref(&project, "refs/meta/config", None, Vec::new()).unwrap(), first);

        assert!(store.writers.lock().is_empty());
    }
}
