//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as integer milliseconds since the Unix epoch so that
//! window comparisons are exact. UUIDs are stored as hyphenated lowercase
//! strings. Enums use their snake_case names.

use std::str::FromStr as _;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use waymark_core::{
  favicon::Favicon,
  site::{DomainRecord, SiteRecord, VisitEntry, VisitType},
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp_millis() }

pub fn decode_ts(ms: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp_millis(ms).ok_or(Error::Timestamp(ms))
}

// ─── VisitType ───────────────────────────────────────────────────────────────

pub fn encode_visit_type(t: VisitType) -> &'static str { t.into() }

pub fn decode_visit_type(s: &str) -> Result<VisitType> {
  VisitType::from_str(s)
    .map_err(|_| waymark_core::Error::UnknownVisitType(s.to_owned()).into())
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawSite::from_row`]; `s` must alias `sites`.
pub const SITE_COLUMNS: &str =
  "s.site_id, s.url, s.visit_count, s.last_visit, s.title, s.icon_hash";

/// Raw values read directly from a `sites` row.
#[derive(Debug)]
pub struct RawSite {
  pub site_id:     String,
  pub url:         String,
  pub visit_count: i64,
  pub last_visit:  i64,
  pub title:       Option<String>,
  pub icon_hash:   Option<String>,
}

impl RawSite {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      site_id:     row.get(0)?,
      url:         row.get(1)?,
      visit_count: row.get(2)?,
      last_visit:  row.get(3)?,
      title:       row.get(4)?,
      icon_hash:   row.get(5)?,
    })
  }

  pub fn into_site(self) -> Result<SiteRecord> {
    Ok(SiteRecord {
      site_id:              decode_uuid(&self.site_id)?,
      url:                  self.url,
      visit_count:          u64::try_from(self.visit_count).unwrap_or_default(),
      last_visit_timestamp: decode_ts(self.last_visit)?,
      title:                self.title,
      icon_reference:       self.icon_hash,
    })
  }
}

/// Raw values read directly from a `visits` row.
#[derive(Debug)]
pub struct RawVisit {
  pub visit_id:            String,
  pub site_id:             String,
  pub timestamp:           i64,
  pub visit_type:          String,
  pub root_id:             i64,
  pub marked_for_deletion: bool,
}

impl RawVisit {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      visit_id:            row.get(0)?,
      site_id:             row.get(1)?,
      timestamp:           row.get(2)?,
      visit_type:          row.get(3)?,
      root_id:             row.get(4)?,
      marked_for_deletion: row.get(5)?,
    })
  }

  pub fn into_visit(self) -> Result<VisitEntry> {
    Ok(VisitEntry {
      visit_id:            decode_uuid(&self.visit_id)?,
      site_id:             decode_uuid(&self.site_id)?,
      timestamp:           decode_ts(self.timestamp)?,
      visit_type:          decode_visit_type(&self.visit_type)?,
      root_id:             self.root_id,
      marked_for_deletion: self.marked_for_deletion,
    })
  }
}

/// Raw values read directly from a `domains` row.
#[derive(Debug)]
pub struct RawDomain {
  pub domain_id:     String,
  pub domain:        String,
  pub provider_name: Option<String>,
  pub icon_hash:     Option<String>,
}

impl RawDomain {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      domain_id:     row.get(0)?,
      domain:        row.get(1)?,
      provider_name: row.get(2)?,
      icon_hash:     row.get(3)?,
    })
  }

  pub fn into_domain(self) -> Result<DomainRecord> {
    Ok(DomainRecord {
      domain_id:      decode_uuid(&self.domain_id)?,
      domain:         self.domain,
      provider_name:  self.provider_name,
      icon_reference: self.icon_hash,
    })
  }
}

pub fn favicon_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Favicon> {
  Ok(Favicon {
    hash:       row.get(0)?,
    media_type: row.get(1)?,
    width:      row.get(2)?,
    height:     row.get(3)?,
    data:       row.get(4)?,
  })
}
