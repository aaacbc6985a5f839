//! Entry point tying the store, the cache and update transactions together

use std::sync::Arc;

use tracing::debug;
use warden_config::{ConfigDocument, ProjectConfig, ProjectName, Revision};
use warden_store::ProjectStore;

use crate::cache::{CacheConfig, ProjectCache, ProjectState};
use crate::config::EngineConfig;
use crate::errors::{Result, SettingsError};
use crate::update::ProjectUpdate;

/// Project creation, lookup and update
#[derive(Debug, Clone)]
pub struct ProjectOperations {
    cache: Arc<ProjectCache>,
}

impl ProjectOperations {
    /// Operations over `store` with a fresh cache
    pub fn new(store: ProjectStore, cache_config: CacheConfig) -> Self {
        Self {
            cache: Arc::new(ProjectCache::new(store, cache_config)),
        }
    }

    /// Open the store described by `config`
    pub fn from_config(config: &EngineConfig) -> std::result::Result<Self, SettingsError> {
        let store = config.build_store()?;
        debug!(
            backend = store.ref_store().backend_name(),
            max_entries = config.cache.max_entries,
            "Opened project operations"
        );
        Ok(Self::new(store, config.cache_config()))
    }

    /// Underlying store
    pub fn store(&self) -> &ProjectStore {
        self.cache.store()
    }

    /// Project state cache
    pub fn cache(&self) -> &ProjectCache {
        &self.cache
    }

    /// Start creating a project
    pub fn new_project(&self) -> ProjectCreation<'_> {
        ProjectCreation {
            operations: self,
            name: None,
        }
    }

    /// Operations on an existing project
    pub fn project(&self, name: &ProjectName) -> PerProjectOperations<'_> {
        PerProjectOperations {
            operations: self,
            name: name.clone(),
        }
    }

    /// Cached state of `name` (a private copy)
    pub fn project_state(&self, name: &ProjectName) -> Result<ProjectState> {
        self.cache.get(name)
    }

    /// Projects whose name starts with `prefix`, sorted
    pub fn list_projects(&self, prefix: Option<&str>) -> Result<Vec<ProjectName>> {
        Ok(self.store().list_projects(prefix)?)
    }
}

/// Builder for a new project
#[derive(Debug)]
#[must_use = "no project is created until `create()` is called"]
pub struct ProjectCreation<'a> {
    operations: &'a ProjectOperations,
    name: Option<String>,
}

impl ProjectCreation<'_> {
    /// Use this name instead of a generated one
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Create the project and return its name
    pub fn create(self) -> Result<ProjectName> {
        let name = self.name.map(ProjectName::new).transpose()?;
        let handle = self.operations.store().create_project(name)?;
        Ok(handle.into_name())
    }
}

/// Operations bound to one project
#[derive(Debug, Clone)]
pub struct PerProjectOperations<'a> {
    operations: &'a ProjectOperations,
    name: ProjectName,
}

impl<'a> PerProjectOperations<'a> {
    /// Project name
    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Parsed configuration, served through the cache. The result is a
    /// private copy; mutating it does not affect the cache.
    pub fn project_config(&self) -> Result<ProjectConfig> {
        Ok(self.operations.cache.get(&self.name)?.into_config())
    }

    /// Currently stored config document, detached from storage
    pub fn config(&self) -> Result<ConfigDocument> {
        let (_, document) = self.operations.store().read_document(&self.name)?;
        Ok(document)
    }

    /// Open an update transaction
    pub fn for_update(&self) -> Result<ProjectUpdate<'a>> {
        ProjectUpdate::open(&self.operations.cache, &self.name)
    }

    /// `HEAD`, the config reference, then remaining references
    pub fn branches(&self) -> Result<Vec<String>> {
        Ok(self.operations.store().branches(&self.name)?)
    }

    /// Config revisions, newest first
    pub fn history(&self) -> Result<Vec<Revision>> {
        Ok(self.operations.store().history(&self.name)?)
    }
}
