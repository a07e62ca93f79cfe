use serde::Serialize;

/// Lifecycle status the public listing shows. Drafts and archived rows
/// never leave the store.
pub const STATUS_PUBLISHED: &str = "published";

/// A portfolio project as consumers see it: every field present, every
/// default already applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
  pub id: String,
  pub title: String,
  pub brand: Option<String>,
  pub description: Option<String>,
  pub image_url: Option<String>,
  pub video_url: Option<String>,
  pub category: String,
  pub tags: Vec<String>,
  pub tech_stack: Vec<String>,
  pub metrics: ProjectMetrics,
  pub link: String,
  pub featured: bool,
  pub has_video: bool,
  pub status: String,
  pub created_at: String,
  pub updated_at: String,
}

/// Headline numbers on a project card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectMetrics {
  /// e.g. "+38%"; "0%" when the store has nothing
  pub conversion_boost: String,
  /// e.g. "1.2s"; "0s" when the store has nothing
  pub load_time: String,
}

impl Default for ProjectMetrics {
  fn default() -> Self {
    Self {
      conversion_boost: "0%".to_string(),
      load_time: "0s".to_string(),
    }
  }
}
