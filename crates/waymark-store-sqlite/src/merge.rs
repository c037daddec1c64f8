//! The merge/upsert engine.
//!
//! Every write runs inside an `IMMEDIATE` transaction, so the lookup and the
//! insert-or-update for a URL happen under the database write lock. The
//! insert itself is `ON CONFLICT DO NOTHING`: if another connection created
//! the row first, the functions here return `Ok(None)`, the transaction rolls
//! back on drop, and the caller retries the whole sequence.

use rusqlite::{OptionalExtension as _, Transaction, TransactionBehavior, params};
use uuid::Uuid;
use waymark_core::favicon::{Favicon, is_better_icon};

use crate::encode::encode_uuid;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// A validated observation: URL normalised, blank title removed, all
/// timestamps resolved to epoch milliseconds.
#[derive(Debug, Clone)]
pub struct SiteObservation {
  pub url:       String,
  pub title:     Option<String>,
  pub icon_hash: Option<String>,
  pub visit:     Option<PreparedVisit>,
  /// Used as `last_visit` for a site created without a visit.
  pub now:       i64,
}

#[derive(Debug, Clone)]
pub struct PreparedVisit {
  pub visit_id:   String,
  pub timestamp:  i64,
  pub visit_type: &'static str,
  pub root_id:    i64,
}

#[derive(Debug, Clone)]
pub struct DomainObservation {
  pub domain:        String,
  pub provider_name: Option<String>,
  pub icon_hash:     Option<String>,
}

/// What a merge did to the row it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
  pub id:      String,
  pub created: bool,
  /// False when the merge left the row exactly as it was.
  pub changed: bool,
}

// ─── Transactions ────────────────────────────────────────────────────────────

/// Create or merge the site for `obs.url` and append its visit, atomically.
pub fn record_visit(
  conn: &mut rusqlite::Connection,
  obs: &SiteObservation,
) -> rusqlite::Result<Option<MergeOutcome>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let Some(mut outcome) = merge_site(&tx, obs)? else {
    return Ok(None);
  };

  if let Some(visit) = &obs.visit {
    append_visit(&tx, &outcome.id, visit)?;
    outcome.changed = true;
  }

  tx.commit()?;
  Ok(Some(outcome))
}

/// Store icon bytes, then offer the icon to the site and, if known, to its
/// registered domain.
pub fn store_favicon(
  conn: &mut rusqlite::Connection,
  favicon: &Favicon,
  site: &SiteObservation,
  domain: Option<&DomainObservation>,
) -> rusqlite::Result<Option<bool>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  tx.execute(
    "INSERT INTO favicons (hash, media_type, width, height, data)
     VALUES (?1, ?2, ?3, ?4, ?5)
     ON CONFLICT(hash) DO NOTHING",
    params![
      favicon.hash,
      favicon.media_type,
      favicon.width,
      favicon.height,
      favicon.data,
    ],
  )?;

  let Some(site_outcome) = merge_site(&tx, site)? else {
    return Ok(None);
  };

  let domain_changed = match domain {
    Some(d) => match merge_domain(&tx, d)? {
      Some(outcome) => outcome.changed,
      None => return Ok(None),
    },
    None => false,
  };

  tx.commit()?;
  Ok(Some(site_outcome.changed || domain_changed))
}

/// Create or update a registered domain on its own.
pub fn record_domain(
  conn: &mut rusqlite::Connection,
  obs: &DomainObservation,
) -> rusqlite::Result<Option<MergeOutcome>> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let Some(outcome) = merge_domain(&tx, obs)? else {
    return Ok(None);
  };
  tx.commit()?;
  Ok(Some(outcome))
}

// ─── Steps ───────────────────────────────────────────────────────────────────

/// Current state of a row the merge may update.
struct Existing {
  id:         String,
  label:      Option<String>,
  icon_hash:  Option<String>,
  icon_width: Option<u32>,
}

impl Existing {
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      label:      row.get(1)?,
      icon_hash:  row.get(2)?,
      icon_width: row.get(3)?,
    })
  }

  /// The icon to keep after offering `candidate` (hash, width).
  fn pick_icon(&self, candidate: Option<(&str, u32)>) -> Option<String> {
    // An icon whose bytes are gone counts as the smallest possible icon.
    let current_width = self.icon_hash.as_ref().map(|_| self.icon_width.unwrap_or(0));
    match candidate {
      Some((hash, width)) if is_better_icon(current_width, width) => Some(hash.to_owned()),
      _ => self.icon_hash.clone(),
    }
  }
}

/// The registered width of a stored icon, or `None` if no such icon exists.
fn stored_icon<'a>(
  tx: &Transaction<'_>,
  hash: Option<&'a str>,
) -> rusqlite::Result<Option<(&'a str, u32)>> {
  let Some(hash) = hash else { return Ok(None) };
  let width: Option<u32> = tx
    .query_row(
      "SELECT width FROM favicons WHERE hash = ?1",
      params![hash],
      |row| row.get(0),
    )
    .optional()?;
  if width.is_none() {
    tracing::debug!(hash, "ignoring reference to unknown favicon");
  }
  Ok(width.map(|w| (hash, w)))
}

fn merge_site(
  tx: &Transaction<'_>,
  obs: &SiteObservation,
) -> rusqlite::Result<Option<MergeOutcome>> {
  let candidate = stored_icon(tx, obs.icon_hash.as_deref())?;

  let existing = tx
    .query_row(
      "SELECT s.site_id, s.title, s.icon_hash, f.width
       FROM sites s
       LEFT JOIN favicons f ON f.hash = s.icon_hash
       WHERE s.url = ?1",
      params![obs.url],
      Existing::from_row,
    )
    .optional()?;

  if let Some(site) = existing {
    let title = obs.title.clone().or_else(|| site.label.clone());
    let icon_hash = site.pick_icon(candidate);
    let changed = title != site.label || icon_hash != site.icon_hash;
    if changed {
      tx.execute(
        "UPDATE sites SET title = ?2, icon_hash = ?3 WHERE site_id = ?1",
        params![site.id, title, icon_hash],
      )?;
    }
    return Ok(Some(MergeOutcome { id: site.id, created: false, changed }));
  }

  let site_id = encode_uuid(Uuid::new_v4());
  let last_visit = obs.visit.as_ref().map_or(obs.now, |v| v.timestamp);
  let inserted = tx.execute(
    "INSERT INTO sites (site_id, url, visit_count, last_visit, title, icon_hash)
     VALUES (?1, ?2, 0, ?3, ?4, ?5)
     ON CONFLICT(url) DO NOTHING",
    params![site_id, obs.url, last_visit, obs.title, candidate.map(|(hash, _)| hash)],
  )?;

  if inserted == 0 {
    return Ok(None);
  }
  Ok(Some(MergeOutcome { id: site_id, created: true, changed: true }))
}

fn append_visit(
  tx: &Transaction<'_>,
  site_id: &str,
  visit: &PreparedVisit,
) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE sites
     SET visit_count = visit_count + 1,
         last_visit  = MAX(last_visit, ?2)
     WHERE site_id = ?1",
    params![site_id, visit.timestamp],
  )?;
  tx.execute(
    "INSERT INTO visits (visit_id, site_id, timestamp, visit_type, root_id, marked_for_deletion)
     VALUES (?1, ?2, ?3, ?4, ?5, 0)",
    params![
      visit.visit_id,
      site_id,
      visit.timestamp,
      visit.visit_type,
      visit.root_id,
    ],
  )?;
  Ok(())
}

fn merge_domain(
  tx: &Transaction<'_>,
  obs: &DomainObservation,
) -> rusqlite::Result<Option<MergeOutcome>> {
  let candidate = stored_icon(tx, obs.icon_hash.as_deref())?;

  let existing = tx
    .query_row(
      "SELECT d.domain_id, d.provider_name, d.icon_hash, f.width
       FROM domains d
       LEFT JOIN favicons f ON f.hash = d.icon_hash
       WHERE d.domain = ?1",
      params![obs.domain],
      Existing::from_row,
    )
    .optional()?;

  if let Some(domain) = existing {
    let provider_name = obs.provider_name.clone().or_else(|| domain.label.clone());
    let icon_hash = domain.pick_icon(candidate);
    let changed = provider_name != domain.label || icon_hash != domain.icon_hash;
    if changed {
      tx.execute(
        "UPDATE domains SET provider_name = ?2, icon_hash = ?3 WHERE domain_id = ?1",
        params![domain.id, provider_name, icon_hash],
      )?;
    }
    return Ok(Some(MergeOutcome { id: domain.id, created: false, changed }));
  }

  let domain_id = encode_uuid(Uuid::new_v4());
  let inserted = tx.execute(
    "INSERT INTO domains (domain_id, domain, provider_name, icon_hash)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(domain) DO NOTHING",
    params![domain_id, obs.domain, obs.provider_name, candidate.map(|(hash, _)| hash)],
  )?;

  if inserted == 0 {
    return Ok(None);
  }
  Ok(Some(MergeOutcome { id: domain_id, created: true, changed: true }))
}
