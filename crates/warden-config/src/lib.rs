//! # Warden Config - Layer 1: Configuration Domain
//!
//! **Purpose**: Pure types for a project's access-control configuration.
//!
//! # Architecture Constraints
//!
//! - YES Document parsing and serialization
//! - YES Permission rule mapping to and from document entries
//! - YES Project names, revisions, group references
//! - NO storage (that's warden-store)
//! - NO caching or transactions (that's warden-project)
//!
//! ## Core Concepts
//!
//! - **ConfigDocument**: ordered section → subsection → key → values text document
//! - **PermissionRule**: one `[access "<ref>"]` entry (action, group, modifiers)
//! - **ProjectConfig**: a document read at a revision, with description and rules

#![forbid(unsafe_code)]

/// Section / subsection / key / value documents
pub mod document;

/// Unified configuration error type
pub mod errors;

/// Access rules and their stored form
pub mod permission;

/// Parsed project configuration
pub mod project;

/// Names, revisions, group references
pub mod types;

pub use document::ConfigDocument;
pub use errors::{ConfigError, Result};
pub use permission::{actions, PermissionKind, PermissionRule, RuleBuilder};
pub use project::ProjectConfig;
pub use types::{GroupReference, ProjectName, Revision};
