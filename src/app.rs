use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use tracing::{debug, info, warn};

use crate::cache::ProjectCache;
use crate::config::Config;
use crate::loader::{LoaderSnapshot, ProjectsLoader};
use crate::output::{self, OutputFormat};
use crate::supabase::client::SupabaseClient;
use crate::watch::ChangeWatcher;

/// Wires the store client, the shared cache, and loaders together.
pub struct App {
  client: SupabaseClient,
  cache: ProjectCache,
  format: OutputFormat,
  title: Option<String>,
}

impl App {
  pub fn new(config: Config, format: OutputFormat) -> Result<Self> {
    let endpoint = config.resolve_store()?;
    if endpoint.is_none() {
      info!("no content store configured; listing will be empty");
    }

    Ok(Self {
      client: SupabaseClient::new(endpoint),
      cache: ProjectCache::new(),
      format,
      title: config.title,
    })
  }

  /// Fetch the listing once and print it.
  ///
  /// A refresh that fails while cached data exists still prints the cached
  /// listing and only warns; with nothing to show the error propagates.
  pub async fn run_once(&self, refresh: bool) -> Result<()> {
    let loader = ProjectsLoader::new(self.client.clone(), self.cache.clone());
    loader.load(refresh).await;

    let snapshot = loader.snapshot();
    match &snapshot.error {
      Some(error) if snapshot.projects.is_empty() => return Err(eyre!("{}", error)),
      Some(error) => warn!(error = %error, "serving last known projects; refresh failed"),
      None => {}
    }

    self.print(&snapshot)
  }

  /// Keep running: reprint the listing whenever the store reports a
  /// change, until ctrl-c.
  pub async fn run_watch(&self, refresh: bool) -> Result<()> {
    let loader = ProjectsLoader::new(self.client.clone(), self.cache.clone());
    loader.load(refresh).await;

    let snapshot = loader.snapshot();
    if let Some(error) = &snapshot.error {
      warn!(error = %error, "initial fetch failed; watching for recovery");
    }
    self.print(&snapshot)?;

    let feed = self.client.spawn_change_feed();
    if feed.is_none() {
      warn!("no events endpoint configured; changes will not be noticed");
    }

    let (watcher, mut refreshed) = ChangeWatcher::spawn(&loader);
    info!(active = watcher.is_active(), "watching for changes");

    // An inert watcher closes the tick channel immediately; watch mode
    // holds the terminal until ctrl-c either way
    let mut ticking = true;
    loop {
      tokio::select! {
        tick = refreshed.recv(), if ticking => {
          match tick {
            Some(()) => self.print(&loader.snapshot())?,
            None => {
              debug!("refresh channel closed");
              ticking = false;
            }
          }
        }
        _ = tokio::signal::ctrl_c() => {
          info!("shutting down");
          break;
        }
      }
    }

    drop(watcher);
    if let Some(feed) = feed {
      feed.abort();
    }
    Ok(())
  }

  fn print(&self, snapshot: &LoaderSnapshot) -> Result<()> {
    let rendered = output::render(self.format, snapshot, self.title.as_deref(), self.fetched_at())?;
    println!("{rendered}");
    Ok(())
  }

  fn fetched_at(&self) -> Option<DateTime<Utc>> {
    self.cache.read().map(|entry| entry.fetched_at)
  }
}
