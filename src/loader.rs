//! Cached loader for the published project collection.
//!
//! Shaped like the usual query-hook pattern: each consumer owns a
//! `ProjectsLoader` with its own collection / loading / error state, while
//! every loader in the process shares one `ProjectCache` slot, so a listing
//! fetched for one consumer is served to the next without a network call.
//!
//! # Example
//!
//! ```ignore
//! let cache = ProjectCache::new();
//! let loader = ProjectsLoader::start(client.clone(), cache.clone());
//!
//! // `start` adopts whatever the cache holds synchronously and
//! // revalidates in the background; render from `snapshot()`.
//! let snapshot = loader.snapshot();
//! ```

use chrono::Duration;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::cache::ProjectCache;
use crate::store::ContentStore;
use crate::supabase::api_types::ApiProject;
use crate::supabase::types::Project;

/// Shown when a fetch fails without a usable message of its own.
const GENERIC_FETCH_ERROR: &str = "Failed to load projects";

/// Point-in-time view of a loader. Owned data: mutating a snapshot never
/// touches the loader or the shared cache.
#[derive(Debug, Clone)]
pub struct LoaderSnapshot {
  pub projects: Vec<Project>,
  pub is_loading: bool,
  pub error: Option<String>,
}

struct LoaderState {
  projects: Vec<Project>,
  loading: bool,
  error: Option<String>,
}

/// Loader for the published project list.
///
/// Clones are handles to the same loader: they share state and the
/// in-flight fetch gate. Separate consumers get separate instances via
/// `new` or `start`, all wired to the same `ProjectCache`.
pub struct ProjectsLoader<S> {
  store: Arc<S>,
  cache: ProjectCache,
  /// How long a cached collection is served without a remote call
  fresh_for: Duration,
  state: Arc<RwLock<LoaderState>>,
  /// At most one outstanding fetch per loader; late arrivals re-check the
  /// cache once they hold the permit
  fetch_gate: Arc<Mutex<()>>,
}

impl<S: ContentStore> ProjectsLoader<S> {
  /// Create a loader seeded from the shared cache: an existing entry of
  /// any age is adopted synchronously, otherwise the loader starts out
  /// loading. No fetch is scheduled; call `load` or use `start`.
  pub fn new(store: S, cache: ProjectCache) -> Self {
    let state = match cache.read() {
      Some(entry) => LoaderState {
        projects: entry.projects,
        loading: false,
        error: None,
      },
      None => LoaderState {
        projects: Vec::new(),
        loading: true,
        error: None,
      },
    };

    Self {
      store: Arc::new(store),
      cache,
      fresh_for: Duration::seconds(30),
      state: Arc::new(RwLock::new(state)),
      fetch_gate: Arc::new(Mutex::new(())),
    }
  }

  /// `new` plus the background revalidation a mounting consumer wants:
  /// cached data shows immediately, a fetch refreshes it behind the
  /// scenes. With a warm cache the fetch bypasses the freshness check so
  /// the entry's age does not matter; with a cold one it is an ordinary
  /// first load.
  #[allow(dead_code)]
  pub fn start(store: S, cache: ProjectCache) -> Self {
    let skip_cache = cache.read().is_some();
    let loader = Self::new(store, cache);

    let task = loader.clone();
    tokio::spawn(async move {
      task.load(skip_cache).await;
    });

    loader
  }

  /// Set how long cached data is served without a remote call.
  #[allow(dead_code)]
  pub fn with_fresh_for(mut self, fresh_for: Duration) -> Self {
    self.fresh_for = fresh_for;
    self
  }

  /// Current state of this loader.
  pub fn snapshot(&self) -> LoaderSnapshot {
    let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
    LoaderSnapshot {
      projects: state.projects.clone(),
      is_loading: state.loading,
      error: state.error.clone(),
    }
  }

  pub(crate) fn store(&self) -> &S {
    &self.store
  }

  /// Fetch the collection, serving a fresh cache entry without a remote
  /// call. The fresh-cache path has no await point, so a caller sees its
  /// final state as soon as `load` returns.
  pub async fn load(&self, skip_cache: bool) {
    if !skip_cache && self.adopt_fresh() {
      return;
    }

    let _permit = self.fetch_gate.lock().await;

    // A fetch that completed while we waited refilled the cache; serve
    // that instead of going out again.
    if !skip_cache && self.adopt_fresh() {
      return;
    }

    self.fetch_and_publish().await;
  }

  /// Fetch from the store unconditionally, ignoring cache freshness.
  /// State and the shared cache update exactly as in `load`.
  pub async fn refetch(&self) {
    self.load(true).await;
  }

  /// Copy a fresh cache entry into loader state. Returns false when the
  /// cache is empty or past the freshness window.
  fn adopt_fresh(&self) -> bool {
    if !self.cache.is_fresh(self.fresh_for) {
      return false;
    }
    let Some(entry) = self.cache.read() else {
      return false;
    };

    debug!(count = entry.projects.len(), "serving projects from cache");
    let mut state = self.lock_state();
    state.projects = entry.projects;
    state.loading = false;
    true
  }

  async fn fetch_and_publish(&self) {
    let had_cache = self.cache.read().is_some();

    {
      let mut state = self.lock_state();
      // Spinner only when there is nothing cached to keep showing; a
      // stale collection stays visible while the refresh runs
      state.loading = !had_cache;
      state.error = None;
    }

    if !self.store.is_configured() {
      // Degraded mode, not a failure: no store, no listing
      debug!("content store not configured; serving empty collection");
      let mut state = self.lock_state();
      state.projects = Vec::new();
      state.loading = false;
      return;
    }

    match self.store.fetch_published().await {
      Ok(rows) => {
        let projects: Vec<Project> = rows.into_iter().map(ApiProject::into_project).collect();
        debug!(count = projects.len(), "projects fetched");
        self.cache.write(projects.clone());
        let mut state = self.lock_state();
        state.projects = projects;
        state.loading = false;
      }
      Err(err) => {
        let mut message = err.to_string();
        if message.trim().is_empty() {
          message = GENERIC_FETCH_ERROR.to_string();
        }
        warn!(error = %message, "project fetch failed; keeping previous collection");
        let mut state = self.lock_state();
        state.error = Some(message);
        state.loading = false;
      }
    }
  }

  fn lock_state(&self) -> RwLockWriteGuard<'_, LoaderState> {
    self.state.write().unwrap_or_else(PoisonError::into_inner)
  }
}

impl<S: ContentStore> Clone for ProjectsLoader<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      cache: self.cache.clone(),
      fresh_for: self.fresh_for,
      state: Arc::clone(&self.state),
      fetch_gate: Arc::clone(&self.fetch_gate),
    }
  }
}
