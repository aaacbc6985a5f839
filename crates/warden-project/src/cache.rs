//! Project state cache
//!
//! Caches parsed [`ProjectConfig`] snapshots by project name. Every lookup
//! returns an independent deep copy, so callers may mutate what they get
//! without affecting the cached snapshot or other callers.
//!
//! Loads run without holding the cache lock. A generation counter, bumped by
//! every invalidation, keeps a load that raced with an invalidation from
//! re-inserting the snapshot it read. The counter is shared by all projects,
//! so the table holds nothing per project beyond the cached entries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};
use warden_config::{ProjectConfig, ProjectName, Revision};
use warden_store::ProjectStore;

use crate::errors::Result;

/// Default maximum number of cached projects
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Cache sizing and expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Least-recently-used entries are evicted beyond this many projects
    pub max_entries: usize,
    /// Entries older than this are reloaded; `None` keeps them until invalidated
    pub ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: None,
        }
    }
}

/// Snapshot of a project's state handed out by the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectState {
    snapshot_id: u64,
    config: ProjectConfig,
}

impl ProjectState {
    /// Identifier of the cached snapshot this copy was taken from.
    ///
    /// Repeated lookups return the same id until the entry is invalidated,
    /// evicted or expires.
    pub fn snapshot_id(&self) -> u64 {
        self.snapshot_id
    }

    /// Project name
    pub fn name(&self) -> &ProjectName {
        self.config.name()
    }

    /// Revision the snapshot was read at
    pub fn revision(&self) -> Option<&Revision> {
        self.config.revision()
    }

    /// Parsed configuration
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Mutable configuration; edits affect only this copy
    pub fn config_mut(&mut self) -> &mut ProjectConfig {
        &mut self.config
    }

    /// Take the configuration out of the state
    pub fn into_config(self) -> ProjectConfig {
        self.config
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache
    pub hits: u64,
    /// Lookups that loaded from the store
    pub misses: u64,
    /// Entries dropped to stay within `max_entries`
    pub evictions: u64,
    /// Entries currently cached
    pub entries: usize,
    /// Configured maximum
    pub capacity: usize,
}

#[derive(Debug)]
struct CachedState {
    state: ProjectState,
    loaded_at: Instant,
    last_used: AtomicU64,
}

impl CachedState {
    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.saturating_duration_since(self.loaded_at) > ttl)
    }
}

#[derive(Debug, Default)]
struct CacheTable {
    entries: HashMap<ProjectName, CachedState>,
    generation: u64,
}

/// Read-through cache of project states over a [`ProjectStore`]
#[derive(Debug)]
pub struct ProjectCache {
    store: ProjectStore,
    config: CacheConfig,
    table: RwLock<CacheTable>,
    clock: AtomicU64,
    next_snapshot: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ProjectCache {
    /// Create an empty cache in front of `store`
    pub fn new(store: ProjectStore, config: CacheConfig) -> Self {
        Self {
            store,
            config,
            table: RwLock::new(CacheTable::default()),
            clock: AtomicU64::new(0),
            next_snapshot: AtomicU64::new(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Store the cache reads through
    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Cache settings
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Current state of `name`, loading it on a miss.
    ///
    /// Store and parse failures are returned and leave the cache untouched.
    pub fn get(&self, name: &ProjectName) -> Result<ProjectState> {
        self.get_at(name, Instant::now())
    }

    /// [`get`](Self::get) evaluated at `now`, for deterministic expiry
    pub fn get_at(&self, name: &ProjectName, now: Instant) -> Result<ProjectState> {
        let generation = {
            let table = self.table.read();
            if let Some(cached) = table.entries.get(name) {
                if !cached.is_expired(self.config.ttl, now) {
                    cached.last_used.store(self.tick(), Ordering::Relaxed);
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(project = %name, snapshot = cached.state.snapshot_id, "Project cache hit");
                    return Ok(cached.state.clone());
                }
            }
            table.generation
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let config = self.store.read_config(name)?;
        let state = ProjectState {
            snapshot_id: self.next_snapshot.fetch_add(1, Ordering::Relaxed),
            config,
        };
        debug!(
            project = %name,
            snapshot = state.snapshot_id,
            revision = ?state.revision().map(Revision::short),
            "Project cache miss, loaded from store"
        );

        self.insert_if_current(generation, &state, now);
        Ok(state)
    }

    /// Cache `state` unless an invalidation happened after `generation` was read.
    fn insert_if_current(&self, generation: u64, state: &ProjectState, now: Instant) -> bool {
        let mut table = self.table.write();
        if table.generation != generation {
            debug!(project = %state.name(), "Cache invalidated during load, not caching");
            return false;
        }
        table.entries.insert(
            state.name().clone(),
            CachedState {
                state: state.clone(),
                loaded_at: now,
                last_used: AtomicU64::new(self.tick()),
            },
        );
        self.evict_over_capacity(&mut table);
        true
    }

    /// Drop the cached state of `name`; the next lookup reloads it
    pub fn invalidate(&self, name: &ProjectName) {
        let mut table = self.table.write();
        table.generation += 1;
        let removed = table.entries.remove(name).is_some();
        debug!(project = %name, removed, "Invalidated project cache entry");
    }

    /// Drop every cached state
    pub fn invalidate_all(&self) {
        let mut table = self.table.write();
        table.generation += 1;
        let removed = table.entries.len();
        table.entries.clear();
        debug!(removed, "Invalidated all project cache entries");
    }

    /// Counters and current size
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.table.read().entries.len(),
            capacity: self.config.max_entries,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_over_capacity(&self, table: &mut CacheTable) {
        while table.entries.len() > self.config.max_entries {
            let oldest = table
                .entries
                .iter()
                .min_by_key(|(_, cached)| cached.last_used.load(Ordering::Relaxed))
                .map(|(name, _)| name.clone());
            let Some(oldest) = oldest else {
                break;
            };
            table.entries.remove(&oldest);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!(project = %oldest, "Evicted least recently used project");
        }
    }
}
