//! Retention operations: range deletes, orphan cleanup, and the two-phase
//! mark/purge flow.
//!
//! Deleting visits never touches `visit_count`. `last_visit` of every site
//! that lost a visit is recomputed from the visits it still has; a site left
//! with none keeps its old value until orphan cleanup removes it.

use rusqlite::{Connection, Transaction, TransactionBehavior, params};

/// Recompute `last_visit` for every site referenced by the `affected` temp
/// table.
fn refresh_last_visit(tx: &Transaction<'_>) -> rusqlite::Result<()> {
  tx.execute(
    "UPDATE sites
     SET last_visit = COALESCE(
       (SELECT MAX(v.timestamp) FROM visits v WHERE v.site_id = sites.site_id),
       last_visit
     )
     WHERE site_id IN (SELECT site_id FROM temp.affected)",
    [],
  )?;
  tx.execute("DROP TABLE temp.affected", [])?;
  Ok(())
}

/// Delete the visits selected by `filter` (a `WHERE` clause over `visits`).
fn delete_visits_where(
  conn: &mut Connection,
  filter: &str,
  params: impl rusqlite::Params + Copy,
) -> rusqlite::Result<u64> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  tx.execute(
    &format!(
      "CREATE TEMP TABLE affected AS
       SELECT DISTINCT site_id FROM visits WHERE {filter}"
    ),
    params,
  )?;
  let deleted = tx.execute(&format!("DELETE FROM visits WHERE {filter}"), params)?;
  refresh_last_visit(&tx)?;

  tx.commit()?;
  Ok(deleted as u64)
}

pub fn delete_visits_in_range(conn: &mut Connection, from: i64, to: i64) -> rusqlite::Result<u64> {
  delete_visits_where(conn, "timestamp >= ?1 AND timestamp < ?2", params![from, to])
}

pub fn purge_marked(conn: &mut Connection) -> rusqlite::Result<u64> {
  delete_visits_where(conn, "marked_for_deletion = 1", [])
}

/// Returns the number of rows changed; zero for an unknown visit.
pub fn mark(conn: &Connection, visit_id: &str, marked: bool) -> rusqlite::Result<u64> {
  let changed = conn.execute(
    "UPDATE visits SET marked_for_deletion = ?2
     WHERE visit_id = ?1 AND marked_for_deletion <> ?2",
    params![visit_id, marked],
  )?;
  Ok(changed as u64)
}

/// Delete sites with no visits, then any favicon nothing refers to.
/// Returns the number of sites removed.
pub fn delete_orphans(conn: &mut Connection) -> rusqlite::Result<u64> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  let sites = tx.execute(
    "DELETE FROM sites
     WHERE NOT EXISTS (SELECT 1 FROM visits v WHERE v.site_id = sites.site_id)",
    [],
  )?;
  let icons = tx.execute(
    "DELETE FROM favicons
     WHERE hash NOT IN (SELECT icon_hash FROM sites   WHERE icon_hash IS NOT NULL)
       AND hash NOT IN (SELECT icon_hash FROM domains WHERE icon_hash IS NOT NULL)",
    [],
  )?;

  tx.commit()?;
  tracing::debug!(sites, icons, "removed orphans");
  Ok(sites as u64)
}
