//! # Warden Store - Layer 2: Versioned Project Storage
//!
//! **Purpose**: Keep every project's configuration document as a chain of
//! immutable revisions behind a compare-and-swap reference.
//!
//! # Architecture Constraints
//!
//! - YES Reference storage backends (memory, filesystem)
//! - YES Optimistic concurrency on the config reference
//! - YES Project creation and name generation
//! - NO caching (that's warden-project)
//! - NO document semantics beyond parse/serialize (that's warden-config)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_store::{MemoryRefStore, ProjectStore};
//!
//! let store = ProjectStore::new(Arc::new(MemoryRefStore::new()));
//! let handle = store.create_project(None)?;
//! let config = store.read_config(handle.name())?;
//! ```

#![forbid(unsafe_code)]

/// Reference store implementations
pub mod backends;

/// Immutable commit objects
pub mod commit;

/// Store error type
pub mod errors;

/// Project-level operations over a reference store
pub mod project_store;

/// Reference store trait and reference naming
pub mod refs;

pub use backends::{FilesystemRefStore, MemoryRefStore};
pub use commit::Commit;
pub use errors::{Result, StoreError};
pub use project_store::{ProjectHandle, ProjectStore, DEFAULT_NAME_PREFIX};
pub use refs::{validate_ref_name, ProjectRefs, RefLayout, RefStore, StoredRef, HEAD};
