//! Read-side SQL. Everything here is synchronous and runs inside a
//! `tokio_rusqlite::Connection::call` closure, shared by one-shot reads and
//! live subscriptions.

use rusqlite::{Connection, OptionalExtension as _, params};
use waymark_core::{favicon::Favicon, store::SiteQuery};

use crate::encode::{
  RawDomain, RawSite, RawVisit, SITE_COLUMNS, encode_ts, favicon_from_row,
};

/// Equal visit counts rank the most recently visited site first, then the
/// older row.
const RANKING: &str = "ORDER BY s.visit_count DESC, s.last_visit DESC, s.rowid ASC";

fn sql_limit(limit: usize) -> i64 { i64::try_from(limit).unwrap_or(i64::MAX) }

fn collect_sites(
  conn: &Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<RawSite>> {
  let mut stmt = conn.prepare(sql)?;
  stmt
    .query_map(params, RawSite::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

pub fn run(conn: &Connection, query: &SiteQuery) -> rusqlite::Result<Vec<RawSite>> {
  match query {
    SiteQuery::History { from, to, text } => collect_sites(
      conn,
      &format!(
        "SELECT {SITE_COLUMNS}
         FROM visits v
         JOIN sites s ON s.site_id = v.site_id
         WHERE v.timestamp >= ?1 AND v.timestamp < ?2
           AND (?3 IS NULL
                OR instr(s.url, ?3) > 0
                OR instr(COALESCE(s.title, ''), ?3) > 0)
         ORDER BY v.timestamp DESC, v.rowid DESC"
      ),
      params![encode_ts(*from), encode_ts(*to), text],
    ),

    SiteQuery::Frequent { since, limit } => collect_sites(
      conn,
      &format!(
        "SELECT {SITE_COLUMNS}
         FROM sites s
         WHERE s.last_visit >= ?1
         {RANKING}
         LIMIT ?2"
      ),
      params![encode_ts(*since), sql_limit(*limit)],
    ),

    // `instr` is a byte-wise, case-sensitive substring test; `LIKE` would
    // fold ASCII case.
    SiteQuery::Suggestions { text, limit } => collect_sites(
      conn,
      &format!(
        "SELECT {SITE_COLUMNS}
         FROM sites s
         WHERE instr(s.url, ?1) > 0
            OR instr(COALESCE(s.title, ''), ?1) > 0
         {RANKING}
         LIMIT ?2"
      ),
      params![text, sql_limit(*limit)],
    ),

    SiteQuery::Recent { text, limit } => collect_sites(
      conn,
      &format!(
        "SELECT {SITE_COLUMNS}
         FROM sites s
         WHERE instr(s.url, ?1) > 0
           AND EXISTS (SELECT 1 FROM visits v
                       WHERE v.site_id = s.site_id AND v.marked_for_deletion = 0)
         ORDER BY s.last_visit DESC, s.rowid DESC
         LIMIT ?2"
      ),
      params![text, sql_limit(*limit)],
    ),

    SiteQuery::AllSites => collect_sites(
      conn,
      &format!("SELECT {SITE_COLUMNS} FROM sites s ORDER BY s.rowid"),
      [],
    ),
  }
}

pub fn site_by_id(conn: &Connection, site_id: &str) -> rusqlite::Result<Option<RawSite>> {
  conn
    .query_row(
      &format!("SELECT {SITE_COLUMNS} FROM sites s WHERE s.site_id = ?1"),
      params![site_id],
      RawSite::from_row,
    )
    .optional()
}

pub fn site_by_url(conn: &Connection, url: &str) -> rusqlite::Result<Option<RawSite>> {
  conn
    .query_row(
      &format!("SELECT {SITE_COLUMNS} FROM sites s WHERE s.url = ?1"),
      params![url],
      RawSite::from_row,
    )
    .optional()
}

pub fn all_visits(conn: &Connection) -> rusqlite::Result<Vec<RawVisit>> {
  let mut stmt = conn.prepare(
    "SELECT visit_id, site_id, timestamp, visit_type, root_id, marked_for_deletion
     FROM visits
     ORDER BY timestamp DESC, rowid DESC",
  )?;
  stmt
    .query_map([], RawVisit::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()
}

pub fn favicon(conn: &Connection, hash: &str) -> rusqlite::Result<Option<Favicon>> {
  conn
    .query_row(
      "SELECT hash, media_type, width, height, data FROM favicons WHERE hash = ?1",
      params![hash],
      favicon_from_row,
    )
    .optional()
}

/// Registered domains starting with `prefix` (already lower-cased).
pub fn domains_with_prefix(
  conn: &Connection,
  prefix: &str,
  limit: usize,
) -> rusqlite::Result<Vec<RawDomain>> {
  let mut stmt = conn.prepare(
    "SELECT domain_id, domain, provider_name, icon_hash
     FROM domains
     WHERE substr(domain, 1, length(?1)) = ?1
     ORDER BY domain
     LIMIT ?2",
  )?;
  stmt
    .query_map(params![prefix, sql_limit(limit)], RawDomain::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()
}
