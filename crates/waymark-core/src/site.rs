//! Site records, visit entries, and the observation input to the merge engine.
//!
//! A site is unique per normalised URL and aggregates every visit recorded
//! against that URL. Visits are append-only and removed only by the
//! retention operations on [`crate::store::HistoryStore`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use uuid::Uuid;

// ─── Sites ───────────────────────────────────────────────────────────────────

/// One row of the record store: a unique URL and its aggregate visit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRecord {
  pub site_id:              Uuid,
  /// Normalised absolute URL; unique across all sites.
  pub url:                  String,
  /// Incremented exactly once per visit merged into this record.
  pub visit_count:          u64,
  pub last_visit_timestamp: DateTime<Utc>,
  pub title:                Option<String>,
  /// Content hash of the best-known favicon, see [`crate::favicon::Favicon`].
  pub icon_reference:       Option<String>,
}

// ─── Visits ──────────────────────────────────────────────────────────────────

/// How the user arrived at a page.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisitType {
  #[default]
  Link,
  Search,
  TopSites,
  Unknown,
}

/// A single visit event, exclusively owned by one [`SiteRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEntry {
  pub visit_id:            Uuid,
  pub site_id:             Uuid,
  pub timestamp:           DateTime<Utc>,
  pub visit_type:          VisitType,
  /// Identifier of the navigation that started this visit chain.
  pub root_id:             i64,
  /// Set while a visit is pending removal by
  /// [`purge_marked_for_deletion`](crate::store::HistoryStore::purge_marked_for_deletion).
  pub marked_for_deletion: bool,
}

/// Visit information attached to an [`Observation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVisit {
  /// Defaults to the current time when absent.
  pub timestamp:  Option<DateTime<Utc>>,
  #[serde(default)]
  pub visit_type: VisitType,
  #[serde(default)]
  pub root_id:    i64,
}

impl NewVisit {
  /// A link visit at a specific point in time.
  pub fn at(timestamp: DateTime<Utc>) -> Self {
    Self { timestamp: Some(timestamp), ..Self::default() }
  }
}

// ─── Observation ─────────────────────────────────────────────────────────────

/// Input to [`crate::store::HistoryStore::record_visit`].
///
/// Without a `visit` only the metadata of the site is merged and no visit is
/// appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
  pub url:            String,
  pub title:          Option<String>,
  pub icon_reference: Option<String>,
  pub visit:          Option<NewVisit>,
}

impl Observation {
  /// Convenience constructor with all optional fields unset.
  pub fn new(url: impl Into<String>) -> Self {
    Self { url: url.into(), ..Self::default() }
  }

  pub fn with_title(mut self, title: impl Into<String>) -> Self {
    self.title = Some(title.into());
    self
  }

  pub fn with_icon(mut self, icon_reference: impl Into<String>) -> Self {
    self.icon_reference = Some(icon_reference.into());
    self
  }

  pub fn with_visit(mut self, visit: NewVisit) -> Self {
    self.visit = Some(visit);
    self
  }

  /// The title to merge, treating blank strings as absent so that a known
  /// title is never replaced by an empty one.
  pub fn effective_title(&self) -> Option<&str> {
    self
      .title
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
  }
}

// ─── Domains ─────────────────────────────────────────────────────────────────

/// A registered domain (e.g. `example.co.uk`) with the best favicon seen for
/// any URL under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRecord {
  pub domain_id:      Uuid,
  pub domain:         String,
  pub provider_name:  Option<String>,
  pub icon_reference: Option<String>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr as _;

  use super::*;

  #[test]
  fn blank_title_is_absent() {
    let obs = Observation::new("https://a.example/").with_title("   ");
    assert_eq!(obs.effective_title(), None);

    let obs = Observation::new("https://a.example/").with_title(" Home ");
    assert_eq!(obs.effective_title(), Some("Home"));
  }

  #[test]
  fn visit_type_column_names() {
    assert_eq!(VisitType::TopSites.as_ref(), "top_sites");
    assert_eq!(VisitType::from_str("search").unwrap(), VisitType::Search);
    assert!(VisitType::from_str("bogus").is_err());
  }
}
