//! Keeps a loader in sync with the store's change feed.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::loader::ProjectsLoader;
use crate::store::ContentStore;

/// Subscription to the store's change channel. Every delivered event
/// triggers one `refetch`; dropping the watcher tears the subscription
/// down.
pub struct ChangeWatcher {
  task: Option<JoinHandle<()>>,
}

impl ChangeWatcher {
  /// Subscribe the loader's store and refetch on every change event.
  ///
  /// Also returns a channel that ticks after each completed refresh, one
  /// tick per event, so a caller can re-render. With an unconfigured
  /// store the watcher is inert and the channel never ticks.
  pub fn spawn<S: ContentStore>(loader: &ProjectsLoader<S>) -> (Self, mpsc::UnboundedReceiver<()>) {
    let (tx, rx) = mpsc::unbounded_channel();

    if !loader.store().is_configured() {
      debug!("content store not configured; change watcher inactive");
      return (Self { task: None }, rx);
    }

    let mut events = loader.store().subscribe();
    let loader = loader.clone();
    let task = tokio::spawn(async move {
      loop {
        match events.recv().await {
          Ok(event) => {
            debug!(?event, "change notification");
            loader.refetch().await;
            // Ignore send errors - receiver may have been dropped
            let _ = tx.send(());
          }
          Err(RecvError::Lagged(missed)) => {
            // Missed notifications collapse into a single catch-up fetch;
            // the fetch returns current rows either way
            warn!(missed, "change feed lagged");
            loader.refetch().await;
            let _ = tx.send(());
          }
          Err(RecvError::Closed) => {
            debug!("change feed closed");
            break;
          }
        }
      }
    });

    (Self { task: Some(task) }, rx)
  }

  /// Whether a subscription task is running.
  pub fn is_active(&self) -> bool {
    self.task.as_ref().is_some_and(|task| !task.is_finished())
  }
}

impl Drop for ChangeWatcher {
  fn drop(&mut self) {
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ProjectCache;
  use crate::store::testing::MockStore;
  use crate::store::ChangeEvent;
  use crate::supabase::api_types::ApiProject;
  use chrono::Utc;
  use serde_json::json;
  use std::time::Duration;

  fn rows(n: usize) -> Vec<ApiProject> {
    (0..n)
      .map(|i| {
        serde_json::from_value(json!({"id": format!("p{i}"), "title": format!("Project {i}")}))
          .expect("row should deserialize")
      })
      .collect()
  }

  #[tokio::test]
  async fn test_change_event_triggers_refetch_and_tick() {
    let store = MockStore::with_rows(rows(2));
    let cache = ProjectCache::new();
    let loader = ProjectsLoader::new(store.clone(), cache.clone());
    loader.load(false).await;
    assert_eq!(store.calls(), 1);

    let (watcher, mut refreshed) = ChangeWatcher::spawn(&loader);
    assert!(watcher.is_active());

    store.set_rows(rows(3));
    let event_time = Utc::now();
    store.push_event(ChangeEvent::Update);

    refreshed.recv().await.expect("refresh tick");
    assert_eq!(store.calls(), 2);
    assert_eq!(loader.snapshot().projects.len(), 3);

    // Cache timestamp moves forward with the event-driven refetch
    let entry = cache.read().expect("entry");
    assert!(entry.fetched_at >= event_time);
  }

  #[tokio::test]
  async fn test_each_event_refetches_even_within_freshness_window() {
    let store = MockStore::with_rows(rows(1));
    let loader = ProjectsLoader::new(store.clone(), ProjectCache::new());
    loader.load(false).await;

    let (_watcher, mut refreshed) = ChangeWatcher::spawn(&loader);

    store.push_event(ChangeEvent::Insert);
    refreshed.recv().await.expect("first tick");
    store.push_event(ChangeEvent::Delete);
    refreshed.recv().await.expect("second tick");

    assert_eq!(store.calls(), 3);
  }

  #[tokio::test]
  async fn test_unconfigured_store_watcher_is_inert() {
    let store = MockStore::unconfigured();
    let loader = ProjectsLoader::new(store.clone(), ProjectCache::new());

    let (watcher, mut refreshed) = ChangeWatcher::spawn(&loader);
    assert!(!watcher.is_active());

    store.push_event(ChangeEvent::Update);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.calls(), 0);
    assert!(refreshed.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_drop_stops_refetching() {
    let store = MockStore::with_rows(rows(1));
    let loader = ProjectsLoader::new(store.clone(), ProjectCache::new());
    loader.load(false).await;

    let (watcher, mut refreshed) = ChangeWatcher::spawn(&loader);
    store.push_event(ChangeEvent::Update);
    refreshed.recv().await.expect("tick while active");
    assert_eq!(store.calls(), 2);

    drop(watcher);
    tokio::time::sleep(Duration::from_millis(10)).await;

    store.push_event(ChangeEvent::Update);
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(store.calls(), 2);
    assert!(refreshed.recv().await.is_none());
  }
}
