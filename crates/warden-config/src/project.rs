//! Parsed view of one project's configuration document.

use indexmap::IndexMap;

use crate::document::ConfigDocument;
use crate::errors::ConfigError;
use crate::permission::{
    rules_from_document, PermissionRule, ACCESS_SECTION, EXCLUSIVE_GROUP_PERMISSIONS,
};
use crate::types::{ProjectName, Revision};

/// Section holding project-wide settings.
pub const PROJECT_SECTION: &str = "project";

/// Key holding the project description.
pub const DESCRIPTION_KEY: &str = "description";

/// A project's configuration as read from one revision of its config reference.
///
/// `revision` is `None` exactly when the config reference does not exist; the
/// description, permissions and document are then empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    name: ProjectName,
    description: String,
    revision: Option<Revision>,
    permissions: Vec<PermissionRule>,
    document: ConfigDocument,
}

impl ProjectConfig {
    /// Configuration of a project whose config reference does not exist.
    pub fn unconfigured(name: ProjectName) -> Self {
        Self {
            name,
            description: String::new(),
            revision: None,
            permissions: Vec::new(),
            document: ConfigDocument::new(),
        }
    }

    /// Interpret a document read at `revision`.
    pub fn from_document(
        name: ProjectName,
        revision: Option<Revision>,
        document: ConfigDocument,
    ) -> Result<Self, ConfigError> {
        let description = document
            .value(PROJECT_SECTION, None, DESCRIPTION_KEY)
            .unwrap_or_default()
            .to_string();
        let permissions = rules_from_document(&document)?;

        Ok(Self {
            name,
            description,
            revision,
            permissions,
            document,
        })
    }

    /// Project this configuration belongs to.
    pub fn name(&self) -> &ProjectName {
        &self.name
    }

    /// Free-text project description; empty when unset.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replace the description. An empty description is removed on save.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Revision the configuration was read from.
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    /// Access rules in stored order.
    pub fn permissions(&self) -> &[PermissionRule] {
        &self.permissions
    }

    /// Mutable access rules.
    pub fn permissions_mut(&mut self) -> &mut Vec<PermissionRule> {
        &mut self.permissions
    }

    /// The document as it was read.
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// Rebuild a document from the current field values.
    ///
    /// Only what was edited is rewritten: an unchanged description and
    /// unchanged `(ref, action)` rule lists keep their stored text, and
    /// everything else is copied from the document that was read.
    pub fn to_document(&self) -> ConfigDocument {
        let mut doc = self.document.clone();

        let stored_description = self
            .document
            .value(PROJECT_SECTION, None, DESCRIPTION_KEY)
            .unwrap_or_default();
        if self.description != stored_description {
            if self.description.is_empty() {
                doc.unset(PROJECT_SECTION, None, DESCRIPTION_KEY);
            } else {
                doc.set_values(PROJECT_SECTION, None, DESCRIPTION_KEY, [self.description.as_str()]);
            }
        }

        // Rewrite rule keys in place so untouched entries keep their position;
        // non-rule keys such as exclusiveGroupPermissions are left alone.
        let mut grouped: IndexMap<(&str, &str), Vec<&PermissionRule>> = IndexMap::new();
        for rule in &self.permissions {
            grouped
                .entry((rule.ref_pattern(), rule.action()))
                .or_default()
                .push(rule);
        }
        for ref_pattern in self.document.subsections(ACCESS_SECTION) {
            for key in self.document.keys(ACCESS_SECTION, Some(ref_pattern)) {
                if key != EXCLUSIVE_GROUP_PERMISSIONS && !grouped.contains_key(&(ref_pattern, key)) {
                    doc.unset(ACCESS_SECTION, Some(ref_pattern), key);
                }
            }
        }
        for ((ref_pattern, action), rules) in grouped {
            if !self.stores_rules(ref_pattern, action, &rules) {
                doc.set_values(
                    ACCESS_SECTION,
                    Some(ref_pattern),
                    action,
                    rules.iter().map(|rule| rule.value()),
                );
            }
        }
        doc
    }

    /// True if the document read holds exactly `rules` under `ref_pattern`/`action`.
    fn stores_rules(&self, ref_pattern: &str, action: &str, rules: &[&PermissionRule]) -> bool {
        let stored = self.document.values(ACCESS_SECTION, Some(ref_pattern), action);
        stored.len() == rules.len()
            && stored.iter().zip(rules).all(|(value, rule)| {
                PermissionRule::from_entry(ref_pattern, action, value)
                    .is_ok_and(|parsed| &parsed == *rule)
            })
    }
}
