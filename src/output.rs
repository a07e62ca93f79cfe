//! Render the project listing for terminals or for pipes.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use serde_json::json;

use crate::loader::LoaderSnapshot;
use crate::supabase::types::Project;

/// How the listing is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
  Pretty,
  Json,
}

/// Render a loader snapshot in the requested format.
pub fn render(
  format: OutputFormat,
  snapshot: &LoaderSnapshot,
  title: Option<&str>,
  fetched_at: Option<DateTime<Utc>>,
) -> Result<String> {
  match format {
    OutputFormat::Pretty => Ok(render_pretty(snapshot, title)),
    OutputFormat::Json => render_json(snapshot, fetched_at),
  }
}

/// JSON envelope for scripting: the normalized projects plus the cache
/// timestamp they were fetched at (null when nothing was fetched).
fn render_json(snapshot: &LoaderSnapshot, fetched_at: Option<DateTime<Utc>>) -> Result<String> {
  let doc = json!({
    "projects": snapshot.projects,
    "fetched_at": fetched_at,
  });
  serde_json::to_string_pretty(&doc).map_err(|e| eyre!("Failed to encode listing: {}", e))
}

fn render_pretty(snapshot: &LoaderSnapshot, title: Option<&str>) -> String {
  let mut out = String::new();

  if let Some(title) = title {
    out.push_str(title);
    out.push_str("\n\n");
  }

  if snapshot.projects.is_empty() {
    out.push_str(if snapshot.is_loading {
      "Loading..."
    } else {
      "No published projects."
    });
    return out;
  }

  out.push_str(&format!(
    "  {:<28} {:<14} {:>7} {:>6}  {}\n",
    "TITLE", "CATEGORY", "BOOST", "LOAD", "TAGS"
  ));
  for project in &snapshot.projects {
    out.push_str(&format_row(project));
    out.push('\n');
  }

  let count = snapshot.projects.len();
  let noun = if count == 1 { "project" } else { "projects" };
  out.push_str(&format!("\n{count} {noun}"));
  out
}

fn format_row(project: &Project) -> String {
  let marker = if project.featured { "*" } else { " " };
  format!(
    "{} {:<28} {:<14} {:>7} {:>6}  {}",
    marker,
    truncate(&project.title, 28),
    truncate(&project.category, 14),
    project.metrics.conversion_boost,
    project.metrics.load_time,
    project.tags.join(", "),
  )
}

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. The cut always lands on a char boundary.
fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{cut}...")
  }
}
