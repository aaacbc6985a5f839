//! Engine settings
//!
//! Loaded from TOML, optionally overridden by `WARDEN_*` environment
//! variables, then validated before building a store:
//!
//! ```toml
//! [refs]
//! default_branch = "refs/heads/master"
//! config_ref = "refs/meta/config"
//!
//! [cache]
//! max_entries = 1024
//! ttl_secs = 300
//!
//! [naming]
//! prefix = "project"
//!
//! [storage]
//! backend = "filesystem"
//! path = "/var/lib/warden"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_store::{
    FilesystemRefStore, MemoryRefStore, ProjectStore, RefLayout, RefStore, DEFAULT_NAME_PREFIX,
};

use crate::cache::{CacheConfig, DEFAULT_MAX_ENTRIES};
use crate::errors::SettingsError;

/// Prefix of environment variables read by [`EngineConfig::merge_with_env`]
pub const ENV_PREFIX: &str = "WARDEN_";

/// Cache section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum cached projects
    pub max_entries: usize,
    /// Entry lifetime in seconds; absent or 0 disables expiry
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl_secs: None,
        }
    }
}

/// Naming section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingSettings {
    /// Prefix of generated project names
    pub prefix: String,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

/// Reference store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local, lost on exit
    #[default]
    Memory,
    /// One directory per project under `path`
    Filesystem,
}

/// Storage section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backend to use
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend
    pub path: Option<PathBuf>,
}

/// Complete engine settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reference names
    pub refs: RefLayout,
    /// Cache sizing and expiry
    pub cache: CacheSettings,
    /// Generated project names
    pub naming: NamingSettings,
    /// Storage backend
    pub storage: StorageSettings,
}

impl EngineConfig {
    /// Parse TOML settings; missing sections and fields take defaults
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML settings file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `WARDEN_*` overrides from the process environment
    pub fn merge_with_process_env(&mut self) -> Result<(), SettingsError> {
        self.merge_with_env(std::env::vars())
    }

    /// Apply `WARDEN_*` overrides from `vars`.
    ///
    /// Recognized: `WARDEN_DEFAULT_BRANCH`, `WARDEN_CONFIG_REF`,
    /// `WARDEN_CACHE_MAX_ENTRIES`, `WARDEN_CACHE_TTL_SECS`,
    /// `WARDEN_NAME_PREFIX`, `WARDEN_STORAGE_BACKEND`, `WARDEN_STORAGE_PATH`.
    /// Other `WARDEN_*` variables are ignored.
    pub fn merge_with_env<I, K, V>(&mut self, vars: I) -> Result<(), SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.into();
            match name {
                "DEFAULT_BRANCH" => self.refs.default_branch = value,
                "CONFIG_REF" => self.refs.config_ref = value,
                "CACHE_MAX_ENTRIES" => self.cache.max_entries = parse_number(key, &value)?,
                "CACHE_TTL_SECS" => self.cache.ttl_secs = Some(parse_number(key, &value)?),
                "NAME_PREFIX" => self.naming.prefix = value,
                "STORAGE_BACKEND" => {
                    self.storage.backend = match value.to_ascii_lowercase().as_str() {
                        "memory" => StorageBackend::Memory,
                        "filesystem" => StorageBackend::Filesystem,
                        _ => {
                            return Err(SettingsError::Environment {
                                variable: key.to_string(),
                                message: format!("unknown backend {value:?}"),
                            })
                        }
                    }
                }
                "STORAGE_PATH" => self.storage.path = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        Ok(())
    }

    /// Check ranges and cross-field consistency
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.refs
            .validate()
            .map_err(|e| SettingsError::invalid("refs", e.to_string()))?;
        if self.cache.max_entries == 0 {
            return Err(SettingsError::invalid(
                "cache.max_entries",
                "must be at least 1",
            ));
        }
        if self.naming.prefix.is_empty() {
            return Err(SettingsError::invalid("naming.prefix", "must not be empty"));
        }
        if self.storage.backend == StorageBackend::Filesystem && self.storage.path.is_none() {
            return Err(SettingsError::invalid(
                "storage.path",
                "required by the filesystem backend",
            ));
        }
        Ok(())
    }

    /// Cache settings in runtime form
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_entries: self.cache.max_entries,
            ttl: self
                .cache
                .ttl_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        }
    }

    /// Validate and open the configured store
    pub fn build_store(&self) -> Result<ProjectStore, SettingsError> {
        self.validate()?;
        let refs: Arc<dyn RefStore> = match (self.storage.backend, &self.storage.path) {
            (StorageBackend::Filesystem, Some(path)) => Arc::new(FilesystemRefStore::open(path)?),
            _ => Arc::new(MemoryRefStore::new()),
        };
        Ok(ProjectStore::new(refs)
            .with_layout(self.refs.clone())?
            .with_name_prefix(self.naming.prefix.clone())?)
    }
}

fn parse_number<T: std::str::FromStr>(variable: &str, value: &str) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| SettingsError::Environment {
        variable: variable.to_string(),
        message: e.to_string(),
    })
}
