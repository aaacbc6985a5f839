//! Configuration update transactions
//!
//! A [`ProjectUpdate`] captures the config document and its revision when it
//! is opened, collects pending edits, and commits them with a single
//! compare-and-swap write. Committing or aborting consumes the transaction;
//! dropping it without committing discards the edits and writes nothing.

use tracing::{debug, info};
use warden_config::{
    project::{DESCRIPTION_KEY, PROJECT_SECTION},
    ConfigDocument, PermissionRule, ProjectName, Revision,
};
use warden_store::StoreError;

use crate::cache::ProjectCache;
use crate::errors::{ProjectError, Result};

/// Result of committing a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The edits left the document byte-identical; nothing was written
    Unchanged,
    /// A new revision was written
    Committed(Revision),
}

impl UpdateOutcome {
    /// Revision written, if any
    pub fn revision(&self) -> Option<&Revision> {
        match self {
            Self::Unchanged => None,
            Self::Committed(revision) => Some(revision),
        }
    }
}

/// Pending edits to one project's configuration
#[derive(Debug)]
#[must_use = "an update writes nothing until `update()` is called"]
pub struct ProjectUpdate<'a> {
    cache: &'a ProjectCache,
    name: ProjectName,
    base_revision: Option<Revision>,
    base_document: ConfigDocument,
    additions: Vec<PermissionRule>,
    description: Option<String>,
}

impl<'a> ProjectUpdate<'a> {
    /// Open a transaction on the current stored configuration of `name`
    pub fn open(cache: &'a ProjectCache, name: &ProjectName) -> Result<Self> {
        let (base_revision, base_document) = cache.store().read_document(name)?;
        debug!(
            project = %name,
            base = ?base_revision.map(|rev| rev.short()),
            "Opened project update"
        );
        Ok(Self {
            cache,
            name: name.clone(),
            base_revision,
            base_document,
            additions: Vec::new(),
            description: None,
        })
    }

    /// Project being updated
    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Revision the transaction is based on
    pub fn base_revision(&self) -> Option<&Revision> {
        self.base_revision.as_ref()
    }

    /// Document as read when the transaction opened
    pub fn base_document(&self) -> &ConfigDocument {
        &self.base_document
    }

    /// Rules queued so far
    pub fn pending(&self) -> &[PermissionRule] {
        &self.additions
    }

    /// Queue a rule. Duplicates of existing or queued rules are kept.
    pub fn add(mut self, rule: PermissionRule) -> Self {
        self.additions.push(rule);
        self
    }

    /// Replace the project description; an empty description removes it
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Base document with the pending edits applied
    pub fn preview(&self) -> ConfigDocument {
        let mut document = self.base_document.clone();
        match self.description.as_deref() {
            Some("") => {
                document.unset(PROJECT_SECTION, None, DESCRIPTION_KEY);
            }
            Some(description) => {
                document.set_values(PROJECT_SECTION, None, DESCRIPTION_KEY, [description]);
            }
            None => {}
        }
        for rule in &self.additions {
            rule.append_to(&mut document);
        }
        document
    }

    /// Commit the pending edits on top of the base revision.
    ///
    /// Fails with [`ProjectError::ConcurrentModification`] if the config
    /// reference moved since the transaction opened. Nothing is retried.
    pub fn update(self) -> Result<UpdateOutcome> {
        let document = self.preview();
        if document.to_bytes() == self.base_document.to_bytes() {
            debug!(project = %self.name, "Project update left configuration unchanged");
            return Ok(UpdateOutcome::Unchanged);
        }

        let store = self.cache.store();
        let revision = match store.write_config(&self.name, self.base_revision.as_ref(), &document)
        {
            Ok(revision) => revision,
            Err(source @ StoreError::StaleRevision { .. }) => {
                return Err(ProjectError::ConcurrentModification {
                    project: self.name,
                    base: self.base_revision,
                    source,
                })
            }
            Err(err) => return Err(err.into()),
        };
        self.cache.invalidate(&self.name);
        info!(
            project = %self.name,
            revision = %revision.short(),
            rules = self.additions.len(),
            "Committed project update"
        );
        Ok(UpdateOutcome::Committed(revision))
    }

    /// Discard the pending edits
    pub fn abort(self) {
        debug!(
            project = %self.name,
            discarded = self.additions.len(),
            "Aborted project update"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use warden_config::{actions, GroupReference};
    use warden_store::{MemoryRefStore, ProjectStore};

    use super::*;
    use crate::cache::CacheConfig;

    fn setup() -> (ProjectCache, ProjectName) {
        let cache = ProjectCache::new(
            ProjectStore::new(Arc::new(MemoryRefStore::new())),
            CacheConfig::default(),
        );
        let name = ProjectName::new("p").unwrap();
        cache.store().create_project(Some(name.clone())).unwrap();
        (cache, name)
    }

    fn rule() -> PermissionRule {
        PermissionRule::allow(actions::READ)
            .ref_pattern("refs/*")
            .group(GroupReference::registered_users())
            .build()
            .unwrap()
    }

    #[test]
    fn empty_update_is_unchanged() {
        let (cache, name) = setup();
        let before = cache.store().history(&name).unwrap();
        let outcome = ProjectUpdate::open(&cache, &name).unwrap().update().unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert_eq!(cache.store().history(&name).unwrap(), before);
    }

    #[test]
    fn abort_writes_nothing() {
        let (cache, name) = setup();
        let before = cache.store().history(&name).unwrap();
        ProjectUpdate::open(&cache, &name).unwrap().add(rule()).abort();
        assert_eq!(cache.store().history(&name).unwrap(), before);
    }

    #[test]
    fn commit_invalidates_cache() {
        let (cache, name) = setup();
        let before = cache.get(&name).unwrap();
        let outcome = ProjectUpdate::open(&cache, &name)
            .unwrap()
            .add(rule())
            .update()
            .unwrap();

        let after = cache.get(&name).unwrap();
        assert_ne!(before.snapshot_id(), after.snapshot_id());
        assert_eq!(after.revision(), outcome.revision());
        assert_eq!(after.config().permissions(), [rule()]);
    }

    #[test]
    fn clearing_missing_description_is_unchanged() {
        let (cache, name) = setup();
        let outcome = ProjectUpdate::open(&cache, &name)
            .unwrap()
            .set_description("")
            .update()
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged);
    }
}
