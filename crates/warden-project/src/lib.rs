//! # Warden Project - Layer 3: Project State and Updates
//!
//! **Purpose**: Serve cached project configuration and apply edits through
//! optimistic-concurrency transactions.
//!
//! # Architecture Constraints
//!
//! - YES Read-through cache with deep-copy isolation
//! - YES Update transactions with compare-and-swap commit
//! - YES Engine settings (TOML + environment)
//! - NO document parsing (that's warden-config)
//! - NO reference storage (that's warden-store)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_config::{actions, GroupReference, PermissionRule};
//! use warden_project::{EngineConfig, ProjectOperations};
//!
//! let ops = ProjectOperations::from_config(&EngineConfig::default())?;
//! let name = ops.new_project().name("demo").create()?;
//! ops.project(&name)
//!     .for_update()?
//!     .add(
//!         PermissionRule::allow(actions::READ)
//!             .ref_pattern("refs/*")
//!             .group(GroupReference::registered_users())
//!             .build()?,
//!     )
//!     .update()?;
//! ```

#![forbid(unsafe_code)]

/// Project state cache
pub mod cache;

/// Engine settings
pub mod config;

/// Project and settings errors
pub mod errors;

/// Operations facade
pub mod operations;

/// Update transactions
pub mod update;

pub use cache::{CacheConfig, CacheStats, ProjectCache, ProjectState};
pub use config::{EngineConfig, StorageBackend};
pub use errors::{ProjectError, Result, SettingsError};
pub use operations::{PerProjectOperations, ProjectCreation, ProjectOperations};
pub use update::{ProjectUpdate, UpdateOutcome};
