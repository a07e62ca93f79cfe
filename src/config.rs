use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// A fully resolved store endpoint: file config overlaid with environment.
#[derive(Debug, Clone)]
pub struct StoreEndpoint {
  pub url: Url,
  pub key: String,
  /// Change-feed endpoint for watch mode, when the deployment has one
  pub events_url: Option<Url>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Custom heading printed above the listing
  pub title: Option<String>,
  #[serde(default)]
  pub store: StoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
  /// Project root url, e.g. https://xyzcompany.supabase.co
  pub url: Option<String>,
  /// Publishable anon key; FOLIO_SUPABASE_KEY overrides
  pub anon_key: Option<String>,
  /// Change-feed url; FOLIO_EVENTS_URL overrides
  pub events_url: Option<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./folio.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/folio/config.yaml
  ///
  /// Having no file anywhere is fine: the store can be configured entirely
  /// from the environment, and with neither the client runs degraded and
  /// shows an empty listing.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => {
        debug!("no config file found; relying on environment");
        Ok(Self::default())
      }
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("folio.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("folio").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Resolve the store endpoint from file config and environment.
  ///
  /// Environment wins over the file. `Ok(None)` means no store is
  /// configured, which is the degraded mode rather than a failure; a value
  /// that is present but unparseable is an error.
  pub fn resolve_store(&self) -> Result<Option<StoreEndpoint>> {
    let url = env_or("FOLIO_SUPABASE_URL", &self.store.url);
    let key = env_or("FOLIO_SUPABASE_KEY", &self.store.anon_key);

    let (Some(url), Some(key)) = (url, key) else {
      return Ok(None);
    };

    let url = Url::parse(&url).map_err(|e| eyre!("Invalid store url {}: {}", url, e))?;
    let events_url = match env_or("FOLIO_EVENTS_URL", &self.store.events_url) {
      Some(raw) => Some(Url::parse(&raw).map_err(|e| eyre!("Invalid events url {}: {}", raw, e))?),
      None => None,
    };

    Ok(Some(StoreEndpoint {
      url,
      key,
      events_url,
    }))
  }
}

/// Environment value if set and non-empty, else the file value.
fn env_or(key: &str, fallback: &Option<String>) -> Option<String> {
  std::env::var(key)
    .ok()
    .filter(|v| !v.is_empty())
    .or_else(|| fallback.clone())
}
