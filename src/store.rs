//! Seam between the loader and the remote content store.

use async_trait::async_trait;
use color_eyre::Result;
use tokio::sync::broadcast;

use crate::supabase::api_types::ApiProject;

/// Notification from the store's change feed. The refresh path treats every
/// kind the same way; the kind is kept for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
  Insert,
  Update,
  Delete,
}

/// What the loader needs from a content store.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
  /// Whether the store is reachable at all. `false` puts consumers in
  /// degraded mode: an empty listing and no error, never a failure.
  fn is_configured(&self) -> bool;

  /// Fetch the published project rows, newest first, capped at the
  /// listing limit.
  async fn fetch_published(&self) -> Result<Vec<ApiProject>>;

  /// Subscribe to change notifications for the projects collection.
  fn subscribe(&self) -> broadcast::Receiver<ChangeEvent>;
}
