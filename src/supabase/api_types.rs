//! Serde-deserializable types matching the content store's project rows.
//!
//! These types are separate from domain types so that a half-filled or
//! mistyped row still deserializes; `into_project` is the one place defaults
//! get applied, and the loose shapes never leave this module.

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Raw row shape
// ============================================================================

/// A project row as the store returns it. Only `id` and `title` are filled
/// on every row in practice; everything else has shipped missing, null, or
/// mistyped at some point and has to be tolerated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiProject {
  // Uuid string on new rows, bigint on rows migrated from the old schema
  #[serde(default)]
  pub id: Value,
  pub title: Option<String>,
  pub brand: Option<String>,
  pub description: Option<String>,
  pub image_url: Option<String>,
  pub video_url: Option<String>,
  pub category: Option<String>,
  /// Text array in healthy rows; anything else normalizes to empty
  #[serde(default)]
  pub tags: Value,
  /// Text array in healthy rows; anything else normalizes to empty
  #[serde(default)]
  pub tech_stack: Value,
  /// JSONB object keyed by the admin panel's camelCase names
  #[serde(default)]
  pub metrics: Value,
  pub link: Option<String>,
  #[serde(default)]
  pub featured: Value,
  #[serde(default)]
  pub has_video: Value,
  pub status: Option<String>,
  pub created_at: Option<String>,
  pub updated_at: Option<String>,
}

// ============================================================================
// Conversion to the domain type
// ============================================================================

use super::types::{Project, ProjectMetrics};

impl ApiProject {
  /// Normalize a raw row into a `Project`.
  ///
  /// Total: every absent, null, or wrong-typed field degrades to its
  /// default instead of failing, so one bad row can never take down the
  /// whole listing.
  pub fn into_project(self) -> Project {
    Project {
      id: coerce_id(&self.id),
      title: self.title.unwrap_or_default(),
      brand: self.brand,
      description: self.description,
      image_url: self.image_url,
      video_url: self.video_url,
      category: self.category.unwrap_or_default(),
      tags: string_list(&self.tags),
      tech_stack: string_list(&self.tech_stack),
      metrics: metrics_from_value(&self.metrics),
      link: self.link.unwrap_or_default(),
      featured: self.featured.as_bool().unwrap_or(false),
      has_video: self.has_video.as_bool().unwrap_or(false),
      status: self.status.unwrap_or_default(),
      created_at: self.created_at.unwrap_or_default(),
      updated_at: self.updated_at.unwrap_or_default(),
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Coerce the id column to a string
/// Ids can be:
/// - A uuid string (current schema)
/// - A bigint (rows migrated from the old schema)
fn coerce_id(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Number(n) => n.to_string(),
    _ => String::new(),
  }
}

/// Read a JSON array of strings, dropping entries that are not strings.
/// A value that is not an array at all becomes the empty list.
fn string_list(value: &Value) -> Vec<String> {
  match value.as_array() {
    Some(items) => items
      .iter()
      .filter_map(Value::as_str)
      .map(String::from)
      .collect(),
    None => Vec::new(),
  }
}

/// Bridge the admin panel's camelCase metrics keys to the domain shape.
/// Each key falls back to its sentinel independently, so a row carrying
/// only `conversionBoost` still gets a usable `load_time`.
fn metrics_from_value(value: &Value) -> ProjectMetrics {
  let defaults = ProjectMetrics::default();
  ProjectMetrics {
    conversion_boost: value
      .get("conversionBoost")
      .and_then(Value::as_str)
      .map(String::from)
      .unwrap_or(defaults.conversion_boost),
    load_time: value
      .get("loadTime")
      .and_then(Value::as_str)
      .map(String::from)
      .unwrap_or(defaults.load_time),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn parse(row: Value) -> ApiProject {
    serde_json::from_value(row).expect("row should deserialize")
  }

  #[test]
  fn test_complete_row_passes_through() {
    let project = parse(json!({
      "id": "a3c1e8d0-0000-4000-8000-000000000001",
      "title": "Checkout Revamp",
      "brand": "Acme",
      "description": "Faster checkout flow",
      "image_url": "https://cdn.example.com/checkout.webp",
      "video_url": "https://cdn.example.com/checkout.mp4",
      "category": "ecommerce",
      "tags": ["web", "conversion"],
      "tech_stack": ["rust", "postgres"],
      "metrics": {"conversionBoost": "+38%", "loadTime": "1.2s"},
      "link": "https://acme.example.com",
      "featured": true,
      "has_video": true,
      "status": "published",
      "created_at": "2024-03-01T10:00:00Z",
      "updated_at": "2024-03-02T10:00:00Z",
    }))
    .into_project();

    assert_eq!(project.id, "a3c1e8d0-0000-4000-8000-000000000001");
    assert_eq!(project.title, "Checkout Revamp");
    assert_eq!(project.brand.as_deref(), Some("Acme"));
    assert_eq!(project.tags, vec!["web", "conversion"]);
    assert_eq!(project.tech_stack, vec!["rust", "postgres"]);
    assert_eq!(project.metrics.conversion_boost, "+38%");
    assert_eq!(project.metrics.load_time, "1.2s");
    assert!(project.featured);
    assert!(project.has_video);
    assert_eq!(project.status, "published");
  }

  #[test]
  fn test_missing_arrays_default_to_empty() {
    let project = parse(json!({"id": "p1", "title": "No arrays"})).into_project();
    assert!(project.tags.is_empty());
    assert!(project.tech_stack.is_empty());
  }

  #[test]
  fn test_wrong_typed_arrays_default_to_empty() {
    let project = parse(json!({
      "id": "p1",
      "title": "Bad arrays",
      "tags": "web, conversion",
      "tech_stack": 7,
    }))
    .into_project();
    assert!(project.tags.is_empty());
    assert!(project.tech_stack.is_empty());
  }

  #[test]
  fn test_non_string_array_entries_are_dropped() {
    let project = parse(json!({
      "id": "p1",
      "title": "Mixed tags",
      "tags": ["web", 3, null, "seo"],
    }))
    .into_project();
    assert_eq!(project.tags, vec!["web", "seo"]);
  }

  #[test]
  fn test_metrics_keys_default_independently() {
    let project = parse(json!({
      "id": "p1",
      "title": "Half metrics",
      "metrics": {"conversionBoost": "+12%"},
    }))
    .into_project();
    assert_eq!(project.metrics.conversion_boost, "+12%");
    assert_eq!(project.metrics.load_time, "0s");
  }

  #[test]
  fn test_malformed_metrics_default_entirely() {
    for bad in [json!([]), json!("fast"), json!(null), json!(42)] {
      let project = parse(json!({"id": "p1", "title": "t", "metrics": bad})).into_project();
      assert_eq!(project.metrics, ProjectMetrics::default());
    }
  }

  #[test]
  fn test_wrong_typed_metrics_keys_fall_back() {
    let project = parse(json!({
      "id": "p1",
      "title": "Numeric metrics",
      "metrics": {"conversionBoost": 38, "loadTime": null},
    }))
    .into_project();
    assert_eq!(project.metrics.conversion_boost, "0%");
    assert_eq!(project.metrics.load_time, "0s");
  }

  #[test]
  fn test_flags_default_to_false() {
    let missing = parse(json!({"id": "p1", "title": "t"})).into_project();
    assert!(!missing.featured);
    assert!(!missing.has_video);

    let mistyped = parse(json!({
      "id": "p1",
      "title": "t",
      "featured": "yes",
      "has_video": 1,
    }))
    .into_project();
    assert!(!mistyped.featured);
    assert!(!mistyped.has_video);
  }

  #[test]
  fn test_null_fields_do_not_fail() {
    let project = parse(json!({
      "id": "p1",
      "title": null,
      "brand": null,
      "description": null,
      "image_url": null,
      "video_url": null,
      "category": null,
      "tags": null,
      "tech_stack": null,
      "metrics": null,
      "link": null,
      "featured": null,
      "has_video": null,
      "status": null,
      "created_at": null,
      "updated_at": null,
    }))
    .into_project();

    assert_eq!(project.title, "");
    assert_eq!(project.brand, None);
    assert_eq!(project.category, "");
    assert!(project.tags.is_empty());
    assert_eq!(project.metrics, ProjectMetrics::default());
    assert_eq!(project.link, "");
    assert!(!project.featured);
  }

  #[test]
  fn test_numeric_id_is_coerced_to_string() {
    let project = parse(json!({"id": 42, "title": "Migrated row"})).into_project();
    assert_eq!(project.id, "42");
  }

  #[test]
  fn test_empty_row_normalizes_to_all_defaults() {
    let project = parse(json!({})).into_project();
    assert_eq!(project.id, "");
    assert_eq!(project.title, "");
    assert_eq!(project.metrics, ProjectMetrics::default());
    assert!(!project.featured);
    assert_eq!(project.created_at, "");
  }
}
