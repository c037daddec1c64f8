//! Plain-text output for the CLI's list views.

use chrono::{DateTime, Local, Utc};
use waymark_core::{
  site::{SiteRecord, VisitEntry},
  suggestion::Suggestion,
};

use crate::client::Suggestions;

fn local(ts: DateTime<Utc>) -> String {
  ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn site_line(site: &SiteRecord) -> String {
  let title = site.title.as_deref().unwrap_or("");
  format!(
    "{:>5}  {}  {}  {}",
    site.visit_count,
    local(site.last_visit_timestamp),
    site.url,
    title
  )
}

pub fn sites(sites: &[SiteRecord]) {
  if sites.is_empty() {
    println!("(none)");
  }
  for site in sites {
    println!("{}", site_line(site));
  }
}

pub fn section(heading: &str, sites: &[SiteRecord]) {
  println!("── {heading} ({})", sites.len());
  for site in sites {
    println!("{}", site_line(site));
  }
}

pub fn visits(visits: &[VisitEntry]) {
  for visit in visits {
    let mark = if visit.marked_for_deletion { "x" } else { " " };
    println!(
      "{mark} {}  {}  {:<9}  site {}",
      visit.visit_id,
      local(visit.timestamp),
      visit.visit_type,
      visit.site_id
    );
  }
}

fn suggestion_line(suggestion: &Suggestion) -> String {
  match suggestion {
    Suggestion::Navigation(nav) => {
      format!("go      {}  ({})  {}", nav.label, nav.secondary_label, nav.url)
    }
    Suggestion::Query(query) => format!("search  {}  {}", query.query, query.url),
  }
}

pub fn suggestions(result: &Suggestions) {
  if let Some(auto) = &result.autocomplete {
    println!("> {}", suggestion_line(auto));
  }
  for suggestion in &result.suggestions {
    println!("  {}", suggestion_line(suggestion));
  }
  if !result.recent_queries.is_empty() {
    println!("── Recent searches");
    for query in &result.recent_queries {
      println!("  {}", suggestion_line(query));
    }
  }
}

#[cfg(test)]
mod tests {
  use uuid::Uuid;
  use waymark_core::suggestion::{NavSuggestion, QuerySuggestion};

  use super::*;

  #[test]
  fn site_line_shows_count_and_title() {
    let site = SiteRecord {
      site_id:              Uuid::nil(),
      url:                  "https://a.example/".to_owned(),
      visit_count:          3,
      last_visit_timestamp: DateTime::<Utc>::UNIX_EPOCH,
      title:                Some("A".to_owned()),
      icon_reference:       None,
    };
    let line = site_line(&site);
    assert!(line.starts_with("    3  "));
    assert!(line.ends_with("https://a.example/  A"));
  }

  #[test]
  fn suggestion_lines() {
    let nav = Suggestion::Navigation(NavSuggestion {
      url:             "https://a.example/".to_owned(),
      label:           "A".to_owned(),
      secondary_label: "a.example".to_owned(),
      icon_reference:  None,
    });
    assert_eq!(suggestion_line(&nav), "go      A  (a.example)  https://a.example/");

    let query = Suggestion::Query(QuerySuggestion {
      url:   "https://search.example/?q=rust".to_owned(),
      query: "rust".to_owned(),
    });
    assert_eq!(suggestion_line(&query), "search  rust  https://search.example/?q=rust");
  }
}
