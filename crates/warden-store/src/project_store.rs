//! Versioned project store
//!
//! Reads and writes each project's configuration document on its config
//! reference, on top of any [`RefStore`] backend.

use std::sync::Arc;

use tracing::{debug, info, trace};
use uuid::Uuid;
use warden_config::{ConfigDocument, ConfigError, ProjectConfig, ProjectName, Revision};

use crate::errors::{Result, StoreError};
use crate::refs::{ProjectRefs, RefLayout, RefStore, HEAD};

/// Prefix of generated project names
pub const DEFAULT_NAME_PREFIX: &str = "project";

const NAME_ATTEMPTS: usize = 16;

/// Newly created project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHandle {
    name: ProjectName,
    refs: ProjectRefs,
}

impl ProjectHandle {
    /// Project name
    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// References created with the project
    pub fn refs(&self) -> &ProjectRefs {
        &self.refs
    }

    /// Revision of the initial config commit
    pub fn config_revision(&self) -> &Revision {
        &self.refs.config_revision
    }

    /// Consume the handle, keeping the name
    pub fn into_name(self) -> ProjectName {
        self.name
    }
}

/// Versioned storage of project configuration documents
#[derive(Clone)]
pub struct ProjectStore {
    refs: Arc<dyn RefStore>,
    layout: RefLayout,
    name_prefix: String,
}

impl std::fmt::Debug for ProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectStore")
            .field("backend", &self.refs.backend_name())
            .field("layout", &self.layout)
            .field("name_prefix", &self.name_prefix)
            .finish()
    }
}

impl ProjectStore {
    /// Store over `refs` with the default layout and name prefix
    pub fn new(refs: Arc<dyn RefStore>) -> Self {
        Self {
            refs,
            layout: RefLayout::default(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }

    /// Use a different reference layout
    pub fn with_layout(mut self, layout: RefLayout) -> Result<Self> {
        layout.validate()?;
        self.layout = layout;
        Ok(self)
    }

    /// Use a different prefix for generated names
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        ProjectName::new(format!("{prefix}-00000000"))?;
        self.name_prefix = prefix;
        Ok(self)
    }

    /// Reference layout in use
    pub fn layout(&self) -> &RefLayout {
        &self.layout
    }

    /// Underlying reference store
    pub fn ref_store(&self) -> &Arc<dyn RefStore> {
        &self.refs
    }

    /// Create a project, generating a unique name when none is given.
    pub fn create_project(&self, name: Option<ProjectName>) -> Result<ProjectHandle> {
        let handle = match name {
            Some(name) => self.create_named(name)?,
            None => self.create_generated()?,
        };
        info!(
            project = %handle.name,
            backend = self.refs.backend_name(),
            config_revision = %handle.refs.config_revision.short(),
            "Created project"
        );
        Ok(handle)
    }

    fn create_named(&self, name: ProjectName) -> Result<ProjectHandle> {
        let refs = self.refs.create_project_refs(&name, &self.layout)?;
        Ok(ProjectHandle { name, refs })
    }

    fn create_generated(&self) -> Result<ProjectHandle> {
        let mut attempt = 1;
        loop {
            let name = self.generate_name()?;
            match self.create_named(name) {
                Err(err @ StoreError::NameConflict { .. }) if attempt < NAME_ATTEMPTS => {
                    debug!(error = %err, attempt, "Generated project name collided, retrying");
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn generate_name(&self) -> Result<ProjectName> {
        let suffix = hex::encode(&Uuid::new_v4().as_bytes()[..4]);
        Ok(ProjectName::new(format!("{}-{suffix}", self.name_prefix))?)
    }

    /// True if the project exists
    pub fn project_exists(&self, name: &ProjectName) -> Result<bool> {
        self.refs.project_exists(name)
    }

    /// Current config document and its revision.
    ///
    /// A missing config reference yields `(None, empty)`; a missing project is
    /// an error.
    pub fn read_document(&self, name: &ProjectName) -> Result<(Option<Revision>, ConfigDocument)> {
        let config_ref = &self.layout.config_ref;
        let Some(stored) = self.refs.read_ref(name, config_ref)? else {
            trace!(project = %name, config_ref = %config_ref, "No config reference");
            return Ok((None, ConfigDocument::new()));
        };
        let document =
            ConfigDocument::from_bytes(&stored.content).map_err(|e| self.document_error(name, e))?;
        trace!(project = %name, revision = %stored.revision.short(), "Read config document");
        Ok((Some(stored.revision), document))
    }

    /// Current parsed configuration
    pub fn read_config(&self, name: &ProjectName) -> Result<ProjectConfig> {
        let (revision, document) = self.read_document(name)?;
        ProjectConfig::from_document(name.clone(), revision, document)
            .map_err(|e| self.document_error(name, e))
    }

    /// Commit `document` on top of `base`.
    ///
    /// Fails with [`StoreError::StaleRevision`] if the config reference no
    /// longer points at `base`.
    pub fn write_config(
        &self,
        name: &ProjectName,
        base: Option<&Revision>,
        document: &ConfigDocument,
    ) -> Result<Revision> {
        let config_ref = &self.layout.config_ref;
        match self.refs.write_ref(name, config_ref, base, document.to_bytes()) {
            Ok(revision) => {
                debug!(
                    project = %name,
                    base = ?base.map(Revision::short),
                    revision = %revision.short(),
                    "Wrote config document"
                );
                Ok(revision)
            }
            Err(err @ StoreError::StaleRevision { .. }) => {
                debug!(project = %name, error = %err, "Rejected stale config write");
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Write a modified configuration on top of the revision it was read at
    pub fn save_project_config(&self, config: &ProjectConfig) -> Result<Revision> {
        self.write_config(config.name(), config.revision(), &config.to_document())
    }

    /// Delete the config reference. Returns false if it was already absent.
    pub fn delete_config_ref(&self, name: &ProjectName) -> Result<bool> {
        let deleted = self.refs.delete_ref(name, &self.layout.config_ref)?;
        debug!(project = %name, deleted, "Deleted config reference");
        Ok(deleted)
    }

    /// `HEAD`, the config reference if present, then remaining references sorted
    pub fn branches(&self, name: &ProjectName) -> Result<Vec<String>> {
        let refs = self.refs.list_refs(name)?;
        let mut branches = Vec::with_capacity(refs.len() + 1);
        branches.push(HEAD.to_string());
        if refs.contains(&self.layout.config_ref) {
            branches.push(self.layout.config_ref.clone());
        }
        branches.extend(refs.into_iter().filter(|r| *r != self.layout.config_ref));
        Ok(branches)
    }

    /// Projects whose name starts with `prefix`, sorted
    pub fn list_projects(&self, prefix: Option<&str>) -> Result<Vec<ProjectName>> {
        let mut projects = self.refs.list_projects()?;
        if let Some(prefix) = prefix {
            projects.retain(|p| p.as_str().starts_with(prefix));
        }
        Ok(projects)
    }

    /// Revisions of the config reference, newest first
    pub fn history(&self, name: &ProjectName) -> Result<Vec<Revision>> {
        self.refs.history(name, &self.layout.config_ref)
    }

    fn document_error(&self, name: &ProjectName, source: ConfigError) -> StoreError {
        StoreError::Document {
            project: name.clone(),
            ref_name: self.layout.config_ref.clone(),
            source,
        }
    }
}
