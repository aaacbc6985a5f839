//! Access rules stored under `[access "<ref pattern>"]` sections.
//!
//! One rule is one value of one key: the subsection is the reference pattern,
//! the key is the permission name, and the value carries the modifiers and the
//! group, e.g. `deny group global:Registered-Users` or
//! `+force group global:Project-Owners`.
//!
//! Only storage is handled here. What `block` means relative to `deny` is up
//! to whoever evaluates the rules.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::document::{is_valid_key_name, ConfigDocument};
use crate::errors::ConfigError;
use crate::types::GroupReference;

/// Section holding access rules.
pub const ACCESS_SECTION: &str = "access";

/// Key inside access sections that is a flag, not a rule.
pub const EXCLUSIVE_GROUP_PERMISSIONS: &str = "exclusiveGroupPermissions";

/// Well-known permission names.
pub mod actions {
    /// Abandon a change.
    pub const ABANDON: &str = "abandon";
    /// Create a reference.
    pub const CREATE: &str = "create";
    /// Delete a reference.
    pub const DELETE: &str = "delete";
    /// Forge the author identity of a commit.
    pub const FORGE_AUTHOR: &str = "forgeAuthor";
    /// Own the matching references.
    pub const OWNER: &str = "owner";
    /// Push to a reference.
    pub const PUSH: &str = "push";
    /// Read a reference.
    pub const READ: &str = "read";
    /// Submit a change.
    pub const SUBMIT: &str = "submit";
}

const DENY: &str = "deny";
const BLOCK: &str = "block";
const FORCE: &str = "+force";
const GROUP: &str = "group";

/// Whether a rule grants or withholds its permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionKind {
    /// Grant the permission.
    Allow,
    /// Withhold the permission.
    Deny,
    /// Withhold the permission and stop more permissive rules from applying.
    Block,
}

impl PermissionKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Allow => "",
            Self::Deny => "deny ",
            Self::Block => "block ",
        }
    }
}

/// One access rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRule {
    action: String,
    ref_pattern: String,
    group: GroupReference,
    kind: PermissionKind,
    force: bool,
}

impl PermissionRule {
    /// Start building a rule that grants `action`.
    pub fn allow(action: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(action, PermissionKind::Allow)
    }

    /// Start building a rule that denies `action`.
    pub fn deny(action: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(action, PermissionKind::Deny)
    }

    /// Start building a rule that blocks `action`.
    pub fn block(action: impl Into<String>) -> RuleBuilder {
        RuleBuilder::new(action, PermissionKind::Block)
    }

    /// Permission name, e.g. `abandon`.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Reference pattern the rule applies to.
    pub fn ref_pattern(&self) -> &str {
        &self.ref_pattern
    }

    /// Group the rule applies to.
    pub fn group(&self) -> &GroupReference {
        &self.group
    }

    /// Allow, deny or block.
    pub fn kind(&self) -> PermissionKind {
        self.kind
    }

    /// True for rules that grant their permission.
    pub fn is_allow(&self) -> bool {
        self.kind == PermissionKind::Allow
    }

    /// True when the `+force` modifier is set.
    pub fn is_force(&self) -> bool {
        self.force
    }

    /// Map one stored entry to a rule.
    ///
    /// Tokens are read in the order `deny`/`block`, `+force`, `group <id>`.
    pub fn from_entry(subsection: &str, key: &str, raw_value: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedPermission {
            section: ACCESS_SECTION.to_string(),
            subsection: subsection.to_string(),
            key: key.to_string(),
            value: raw_value.to_string(),
            reason: reason.to_string(),
        };

        if subsection.is_empty() {
            return Err(malformed("empty reference pattern"));
        }

        let mut kind = PermissionKind::Allow;
        let mut force = false;
        let mut rest = raw_value.trim();

        loop {
            let (token, tail) = match rest.split_once(char::is_whitespace) {
                Some((token, tail)) => (token, tail.trim_start()),
                None => (rest, ""),
            };
            match token {
                DENY | BLOCK if kind != PermissionKind::Allow || force => {
                    return Err(malformed("modifier out of order or repeated"));
                }
                DENY => kind = PermissionKind::Deny,
                BLOCK => kind = PermissionKind::Block,
                FORCE if force => return Err(malformed("+force repeated")),
                FORCE if kind != PermissionKind::Allow => {
                    return Err(malformed("+force is only valid on allow rules"));
                }
                FORCE => force = true,
                GROUP => {
                    let group = tail.trim();
                    if group.is_empty() {
                        return Err(malformed("missing group reference"));
                    }
                    return Ok(Self {
                        action: key.to_string(),
                        ref_pattern: subsection.to_string(),
                        group: GroupReference::new(group),
                        kind,
                        force,
                    });
                }
                "" => return Err(malformed("missing group reference")),
                other => return Err(malformed(format!("unexpected token {other:?}").as_str())),
            }
            rest = tail;
        }
    }

    /// The `(subsection, key, value)` this rule is stored as.
    pub fn to_entry(&self) -> (&str, &str, String) {
        (&self.ref_pattern, &self.action, self.value())
    }

    /// Stored value, e.g. `+force group global:Registered-Users`.
    pub fn value(&self) -> String {
        let force = if self.force { "+force " } else { "" };
        format!("{}{force}group {}", self.kind.prefix(), self.group)
    }

    /// Append this rule under its access subsection.
    pub fn append_to(&self, doc: &mut ConfigDocument) {
        doc.add_value(ACCESS_SECTION, Some(&self.ref_pattern), &self.action, self.value());
    }
}

impl fmt::Display for PermissionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}: {}", self.action, self.ref_pattern, self.value())
    }
}

/// Builder for [`PermissionRule`].
#[derive(Debug, Clone)]
#[must_use]
pub struct RuleBuilder {
    action: String,
    kind: PermissionKind,
    ref_pattern: Option<String>,
    group: Option<GroupReference>,
    force: bool,
}

impl RuleBuilder {
    fn new(action: impl Into<String>, kind: PermissionKind) -> Self {
        Self {
            action: action.into(),
            kind,
            ref_pattern: None,
            group: None,
            force: false,
        }
    }

    /// Reference pattern, e.g. `refs/heads/*`.
    pub fn ref_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ref_pattern = Some(pattern.into());
        self
    }

    /// Group the rule applies to.
    pub fn group(mut self, group: impl Into<GroupReference>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set or clear the `+force` modifier.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Finish the rule.
    pub fn build(self) -> Result<PermissionRule, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRule {
            action: self.action.clone(),
            reason: reason.to_string(),
        };

        if !is_valid_key_name(&self.action) {
            return Err(invalid("permission name is not a valid key"));
        }
        if self.action == EXCLUSIVE_GROUP_PERMISSIONS {
            return Err(invalid("reserved key"));
        }
        let ref_pattern = match &self.ref_pattern {
            Some(pattern) if !pattern.is_empty() && !pattern.contains('\n') => pattern.clone(),
            Some(_) => return Err(invalid("reference pattern is empty or multi-line")),
            None => return Err(invalid("missing reference pattern")),
        };
        let group = match &self.group {
            Some(group) if !group.as_str().is_empty() && group.as_str().trim() == group.as_str() => {
                group.clone()
            }
            Some(_) => return Err(invalid("group reference is empty or padded")),
            None => return Err(invalid("missing group")),
        };
        if self.force && self.kind != PermissionKind::Allow {
            return Err(invalid("+force is only valid on allow rules"));
        }

        Ok(PermissionRule {
            action: self.action,
            ref_pattern,
            group,
            kind: self.kind,
            force: self.force,
        })
    }
}

/// Read every rule from the access sections of `doc`, in stored order.
pub fn rules_from_document(doc: &ConfigDocument) -> Result<Vec<PermissionRule>, ConfigError> {
    let mut rules = Vec::new();
    for ref_pattern in doc.subsections(ACCESS_SECTION) {
        for (key, value) in doc.entries(ACCESS_SECTION, Some(ref_pattern)) {
            if key == EXCLUSIVE_GROUP_PERMISSIONS {
                trace!(ref_pattern, value, "Skipping exclusive group marker");
                continue;
            }
            rules.push(PermissionRule::from_entry(ref_pattern, key, value)?);
        }
    }
    Ok(rules)
}
