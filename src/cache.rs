//! Process-wide cache slot for the published project list.
//!
//! There is one slot per process, injected by handle: the app constructs a
//! `ProjectCache` once and clones it into every loader, so concurrent
//! consumers of the listing share one fetch instead of issuing their own.
//! The slot is replaced wholesale on every successful fetch; nothing ever
//! mutates a cached collection in place.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

use crate::supabase::types::Project;

/// Last-known-good collection plus the moment it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub projects: Vec<Project>,
  pub fetched_at: DateTime<Utc>,
}

/// Handle to the shared cache slot. Cloning the handle shares the slot.
#[derive(Debug, Clone, Default)]
pub struct ProjectCache {
  slot: Arc<RwLock<Option<CacheEntry>>>,
}

impl ProjectCache {
  /// Create an empty cache slot.
  pub fn new() -> Self {
    Self::default()
  }

  /// Clone out the current entry, if any.
  pub fn read(&self) -> Option<CacheEntry> {
    self
      .slot
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Replace the slot with a fresh collection, stamped now.
  ///
  /// Collection and timestamp swap together under one guard, so a reader
  /// can never observe one fetch's data with another fetch's timestamp.
  pub fn write(&self, projects: Vec<Project>) {
    let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(CacheEntry {
      projects,
      fetched_at: Utc::now(),
    });
  }

  /// Whether the slot holds an entry no older than `max_age`. An empty
  /// slot is never fresh.
  pub fn is_fresh(&self, max_age: Duration) -> bool {
    let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
    match slot.as_ref() {
      Some(entry) => Utc::now() - entry.fetched_at <= max_age,
      None => false,
    }
  }

  /// Store an entry with an explicit timestamp. Lets tests age the cache
  /// without sleeping through the freshness window.
  #[cfg(test)]
  pub(crate) fn write_at(&self, projects: Vec<Project>, fetched_at: DateTime<Utc>) {
    let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(CacheEntry {
      projects,
      fetched_at,
    });
  }
}
