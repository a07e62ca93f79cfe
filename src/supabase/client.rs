use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::StoreEndpoint;
use crate::store::{ChangeEvent, ContentStore};
use crate::supabase::api_types::ApiProject;
use crate::supabase::types::STATUS_PUBLISHED;

/// Columns the listing asks for, in listing order.
const PROJECT_COLUMNS: &str = "id,title,brand,description,image_url,video_url,category,tags,\
                               tech_stack,metrics,link,featured,has_video,status,created_at,updated_at";

/// Hard cap on the listing size.
const PROJECT_LIMIT: u32 = 100;

/// Wait between reconnect attempts when the change feed drops.
const FEED_RETRY: Duration = Duration::from_secs(5);

/// Content store client.
///
/// `endpoint: None` is the supported degraded mode, not an error: reads
/// resolve to nothing and the change feed stays silent, so the app renders
/// an empty listing instead of failing.
#[derive(Clone)]
pub struct SupabaseClient {
  http: reqwest::Client,
  endpoint: Option<StoreEndpoint>,
  events: broadcast::Sender<ChangeEvent>,
}

impl SupabaseClient {
  pub fn new(endpoint: Option<StoreEndpoint>) -> Self {
    let (events, _) = broadcast::channel(64);
    Self {
      http: reqwest::Client::new(),
      endpoint,
      events,
    }
  }

  /// REST url for the published listing: selected columns, published rows
  /// only, newest first, capped.
  fn listing_url(endpoint: &StoreEndpoint) -> Result<Url> {
    let mut url = endpoint
      .url
      .join("rest/v1/projects")
      .map_err(|e| eyre!("Failed to build listing url: {}", e))?;
    url
      .query_pairs_mut()
      .append_pair("select", PROJECT_COLUMNS)
      .append_pair("status", &format!("eq.{STATUS_PUBLISHED}"))
      .append_pair("order", "created_at.desc")
      .append_pair("limit", &PROJECT_LIMIT.to_string());
    Ok(url)
  }

  async fn fetch_rows(&self, endpoint: &StoreEndpoint) -> Result<Vec<ApiProject>> {
    let url = Self::listing_url(endpoint)?;
    debug!(%url, "fetching projects");

    let response = self
      .http
      .get(url)
      .header("apikey", &endpoint.key)
      .bearer_auth(&endpoint.key)
      .send()
      .await
      .map_err(|e| eyre!("Failed to reach content store: {}", e))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(eyre!("Content store returned {}: {}", status, body.trim()));
    }

    response
      .json::<Vec<ApiProject>>()
      .await
      .map_err(|e| eyre!("Failed to parse project rows: {}", e))
  }

  /// Start the change-feed reader, if the deployment exposes one.
  ///
  /// The task republishes feed frames on the broadcast channel that
  /// `subscribe` hands out and reconnects with a fixed delay whenever the
  /// stream drops. The caller owns the handle; aborting it stops the feed.
  pub fn spawn_change_feed(&self) -> Option<JoinHandle<()>> {
    let endpoint = self.endpoint.as_ref()?;
    let feed_url = endpoint.events_url.clone()?;
    let key = endpoint.key.clone();
    let http = self.http.clone();
    let events = self.events.clone();

    Some(tokio::spawn(async move {
      loop {
        match read_feed(&http, feed_url.clone(), &key, &events).await {
          Ok(()) => info!("change feed closed; reconnecting"),
          Err(err) => warn!(error = %err, "change feed failed; reconnecting"),
        }
        tokio::time::sleep(FEED_RETRY).await;
      }
    }))
  }
}

#[async_trait]
impl ContentStore for SupabaseClient {
  fn is_configured(&self) -> bool {
    self.endpoint.is_some()
  }

  async fn fetch_published(&self) -> Result<Vec<ApiProject>> {
    match &self.endpoint {
      Some(endpoint) => self.fetch_rows(endpoint).await,
      None => Err(eyre!("Content store is not configured")),
    }
  }

  fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
    self.events.subscribe()
  }
}

/// Read one connection's worth of feed frames, publishing each recognized
/// change. Returns when the server closes the stream.
async fn read_feed(
  http: &reqwest::Client,
  url: Url,
  key: &str,
  events: &broadcast::Sender<ChangeEvent>,
) -> Result<()> {
  let response = http
    .get(url)
    .header("apikey", key)
    .header("Accept", "text/event-stream")
    .send()
    .await
    .map_err(|e| eyre!("Failed to connect to change feed: {}", e))?;

  if !response.status().is_success() {
    return Err(eyre!("Change feed returned {}", response.status()));
  }
  info!("change feed connected");

  let mut stream = response.bytes_stream();
  let mut buffer = String::new();

  while let Some(chunk) = stream.next().await {
    let chunk = chunk.map_err(|e| eyre!("Change feed read failed: {}", e))?;
    buffer.push_str(&String::from_utf8_lossy(&chunk));

    // Frames are separated by a blank line
    while let Some(pos) = buffer.find("\n\n") {
      let frame = buffer[..pos].to_string();
      buffer.drain(..pos + 2);

      if let Some(event) = parse_feed_frame(&frame) {
        // Ignore send errors - no watcher is subscribed right now
        let _ = events.send(event);
      }
    }
  }

  Ok(())
}

/// Parse one server-sent-events frame into a change notification.
/// The mutation kind arrives either as the `event:` name or inside the
/// JSON `data:` payload; unrecognized frames (keepalives, comments) are
/// dropped.
fn parse_feed_frame(frame: &str) -> Option<ChangeEvent> {
  let mut event_name = None;
  let mut data = None;

  for line in frame.lines() {
    if let Some(value) = line.strip_prefix("event: ") {
      event_name = Some(value.trim());
    } else if let Some(value) = line.strip_prefix("data: ") {
      data = Some(value);
    }
  }

  if let Some(event) = event_name.and_then(change_kind) {
    return Some(event);
  }

  let payload: Value = serde_json::from_str(data?).ok()?;
  payload
    .get("type")
    .or_else(|| payload.get("eventType"))
    .and_then(Value::as_str)
    .and_then(change_kind)
}

fn change_kind(name: &str) -> Option<ChangeEvent> {
  match name.to_ascii_uppercase().as_str() {
    "INSERT" => Some(ChangeEvent::Insert),
    "UPDATE" => Some(ChangeEvent::Update),
    "DELETE" => Some(ChangeEvent::Delete),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn endpoint() -> StoreEndpoint {
    StoreEndpoint {
      url: Url::parse("https://demo.supabase.co").expect("url"),
      key: "anon-key".to_string(),
      events_url: None,
    }
  }

  #[test]
  fn test_listing_url_filters_orders_and_caps() {
    let url = SupabaseClient::listing_url(&endpoint()).expect("url");

    assert_eq!(url.path(), "/rest/v1/projects");
    let query: Vec<(String, String)> = url
      .query_pairs()
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect();
    assert!(query.contains(&("status".to_string(), "eq.published".to_string())));
    assert!(query.contains(&("order".to_string(), "created_at.desc".to_string())));
    assert!(query.contains(&("limit".to_string(), "100".to_string())));
    let select = &query.iter().find(|(k, _)| k == "select").expect("select").1;
    assert!(select.starts_with("id,title,"));
    assert!(select.contains("metrics"));
  }

  #[test]
  fn test_unconfigured_client_reports_degraded() {
    let client = SupabaseClient::new(None);
    assert!(!client.is_configured());
    assert!(client.spawn_change_feed().is_none());
  }

  #[tokio::test]
  async fn test_unconfigured_fetch_is_an_error() {
    let client = SupabaseClient::new(None);
    let err = client.fetch_published().await.expect_err("should fail");
    assert!(err.to_string().contains("not configured"));
  }

  #[test]
  fn test_parse_frame_with_event_name() {
    let frame = "event: INSERT\ndata: {\"table\":\"projects\"}";
    assert_eq!(parse_feed_frame(frame), Some(ChangeEvent::Insert));
  }

  #[test]
  fn test_parse_frame_with_json_payload_kind() {
    let frame = "data: {\"eventType\":\"UPDATE\",\"table\":\"projects\"}";
    assert_eq!(parse_feed_frame(frame), Some(ChangeEvent::Update));

    let frame = "data: {\"type\":\"delete\"}";
    assert_eq!(parse_feed_frame(frame), Some(ChangeEvent::Delete));
  }

  #[test]
  fn test_keepalive_and_unknown_frames_are_dropped() {
    assert_eq!(parse_feed_frame(": keepalive"), None);
    assert_eq!(parse_feed_frame("event: SYSTEM\ndata: {}"), None);
    assert_eq!(parse_feed_frame("data: not json"), None);
    assert_eq!(parse_feed_frame(""), None);
  }
}
