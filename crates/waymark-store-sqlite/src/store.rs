//! [`SqliteStore`]: the SQLite implementation of [`HistoryStore`].

use std::{path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use waymark_core::{
  domain::{DomainResolver, SuffixListResolver},
  favicon::Favicon,
  normalize_url,
  site::{DomainRecord, Observation, SiteRecord, VisitEntry},
  store::{HistoryStore, SiteQuery},
};

use crate::{
  Error, Result,
  encode::{RawDomain, RawSite, RawVisit, encode_ts, encode_uuid, encode_visit_type},
  live::SiteSubscription,
  merge::{self, DomainObservation, MergeOutcome, PreparedVisit, SiteObservation},
  purge, queries,
  schema::{self, LATEST_VERSION, MIGRATIONS},
};

/// How many times a merge is retried after losing an insert race.
const MERGE_ATTEMPTS: usize = 3;

// ─── Change notification ─────────────────────────────────────────────────────

/// Bump the generation every live view watches. Called inside the
/// `conn.call` closure that committed, never from the awaiting caller.
fn publish(changes: &watch::Sender<u64>) { changes.send_modify(|g| *g = g.wrapping_add(1)); }

fn publish_if(changes: &watch::Sender<u64>, changed: bool) {
  if changed {
    publish(changes);
  }
}

/// A merge result that knows whether it altered stored rows.
trait Committed {
  fn changed(&self) -> bool;
}

impl Committed for MergeOutcome {
  fn changed(&self) -> bool { self.changed }
}

impl Committed for bool {
  fn changed(&self) -> bool { *self }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Waymark history store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the change channel.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  changes:  Arc<watch::Sender<u64>>,
  resolver: Arc<dyn DomainResolver>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  /// Replace the resolver used to map URLs to registered domains.
  pub fn with_resolver(mut self, resolver: Arc<dyn DomainResolver>) -> Self {
    self.resolver = resolver;
    self
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let (changes, _) = watch::channel(0);
    let store = Self {
      conn,
      changes: Arc::new(changes),
      resolver: Arc::new(SuffixListResolver::default()),
    };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    let found = self
      .conn
      .call(|conn| {
        schema::configure(conn)?;
        Ok(schema::user_version(conn)?)
      })
      .await?;

    if found > LATEST_VERSION {
      return Err(Error::UnsupportedSchema { found, supported: LATEST_VERSION });
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > found) {
      let version = migration.version;
      self
        .conn
        .call(move |conn| Ok(schema::apply(conn, migration)?))
        .await
        .map_err(|source| Error::Migration { version, source })?;
      tracing::info!(version, description = migration.description, "applied migration");
    }

    Ok(())
  }

  /// Run a merge closure, retrying while it reports a lost insert race.
  ///
  /// Live views are notified on the database thread as soon as a merge that
  /// changed something commits, even if the caller stops waiting.
  async fn merge_with_retry<T, F>(&self, url: &str, op: F) -> Result<T>
  where
    T: Committed + Send + 'static,
    F: Fn(&mut rusqlite::Connection) -> rusqlite::Result<Option<T>>
      + Clone
      + Send
      + 'static,
  {
    for attempt in 1..=MERGE_ATTEMPTS {
      let op = op.clone();
      let changes = Arc::clone(&self.changes);
      let merged = self
        .conn
        .call(move |conn| {
          let out = op(conn)?;
          if out.as_ref().is_some_and(Committed::changed) {
            publish(&changes);
          }
          Ok(out)
        })
        .await?;
      if let Some(out) = merged {
        return Ok(out);
      }
      tracing::debug!(url, attempt, "lost insert race, retrying merge");
    }
    Err(Error::Conflict(url.to_owned()))
  }

  /// The resolver's registered domain for `url`, lower-cased.
  fn domain_of(&self, url: &str) -> Option<String> {
    self.resolver.registered_domain(url).map(|d| d.to_lowercase())
  }
}

// ─── HistoryStore impl ───────────────────────────────────────────────────────

impl HistoryStore for SqliteStore {
  type Error = Error;
  type Subscription = SiteSubscription;

  // ── Merge / upsert ────────────────────────────────────────────────────────

  async fn record_visit(&self, observation: Observation) -> Result<()> {
    let url = normalize_url(&observation.url)?;
    let now = Utc::now();

    let obs = SiteObservation {
      url:       url.clone(),
      title:     observation.effective_title().map(str::to_owned),
      icon_hash: observation.icon_reference.clone(),
      visit:     observation.visit.map(|v| PreparedVisit {
        visit_id:   encode_uuid(Uuid::new_v4()),
        timestamp:  encode_ts(v.timestamp.unwrap_or(now)),
        visit_type: encode_visit_type(v.visit_type),
        root_id:    v.root_id,
      }),
      now:       encode_ts(now),
    };

    let outcome: MergeOutcome = self
      .merge_with_retry(&url, move |conn| merge::record_visit(conn, &obs))
      .await?;

    tracing::debug!(
      %url,
      site_id = %outcome.id,
      created = outcome.created,
      "recorded visit"
    );
    Ok(())
  }

  async fn store_favicon(&self, url: String, favicon: Favicon) -> Result<()> {
    let url = normalize_url(&url)?;
    let hash = favicon.hash.clone();

    let site = SiteObservation {
      url:       url.clone(),
      title:     None,
      icon_hash: Some(hash.clone()),
      visit:     None,
      now:       encode_ts(Utc::now()),
    };
    let domain = self.domain_of(&url).map(|domain| DomainObservation {
      domain,
      provider_name: None,
      icon_hash: Some(hash.clone()),
    });

    let favicon = Arc::new(favicon);
    let changed = self
      .merge_with_retry(&url, move |conn| {
        merge::store_favicon(conn, &favicon, &site, domain.as_ref())
      })
      .await?;

    tracing::debug!(%url, %hash, changed, "stored favicon");
    Ok(())
  }

  async fn record_domain(&self, url: String, provider_name: Option<String>) -> Result<()> {
    let url = normalize_url(&url)?;
    let Some(domain) = self.domain_of(&url) else {
      tracing::debug!(%url, "no registered domain");
      return Ok(());
    };

    let obs = DomainObservation {
      domain:        domain.clone(),
      provider_name: provider_name
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty()),
      icon_hash:     None,
    };
    let outcome = self
      .merge_with_retry(&domain, move |conn| merge::record_domain(conn, &obs))
      .await?;

    tracing::debug!(%domain, created = outcome.created, "recorded domain");
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_site(&self, site_id: Uuid) -> Result<Option<SiteRecord>> {
    let id_str = encode_uuid(site_id);
    let raw = self
      .conn
      .call(move |conn| Ok(queries::site_by_id(conn, &id_str)?))
      .await?;
    raw.map(RawSite::into_site).transpose()
  }

  async fn find_site(&self, url: String) -> Result<Option<SiteRecord>> {
    let url = normalize_url(&url)?;
    let raw = self
      .conn
      .call(move |conn| Ok(queries::site_by_url(conn, &url)?))
      .await?;
    raw.map(RawSite::into_site).transpose()
  }

  async fn list_sites(&self) -> Result<Vec<SiteRecord>> {
    self.query(SiteQuery::AllSites).await
  }

  async fn list_visits(&self) -> Result<Vec<VisitEntry>> {
    let raws = self
      .conn
      .call(|conn| Ok(queries::all_visits(conn)?))
      .await?;
    raws.into_iter().map(RawVisit::into_visit).collect()
  }

  async fn get_favicon(&self, hash: String) -> Result<Option<Favicon>> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(queries::favicon(conn, &hash)?))
        .await?,
    )
  }

  async fn query(&self, query: SiteQuery) -> Result<Vec<SiteRecord>> {
    let raws = self
      .conn
      .call(move |conn| Ok(queries::run(conn, &query)?))
      .await?;
    raws.into_iter().map(RawSite::into_site).collect()
  }

  async fn domain_suggestions(&self, prefix: String, limit: usize) -> Result<Vec<DomainRecord>> {
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
      return Ok(Vec::new());
    }
    let raws = self
      .conn
      .call(move |conn| Ok(queries::domains_with_prefix(conn, &prefix, limit)?))
      .await?;
    raws.into_iter().map(RawDomain::into_domain).collect()
  }

  fn subscribe(&self, query: SiteQuery) -> SiteSubscription {
    SiteSubscription::new(self.conn.clone(), query, self.changes.subscribe())
  }

  // ── Retention ─────────────────────────────────────────────────────────────

  async fn delete_visits_in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u64> {
    let (from_ms, to_ms) = (encode_ts(from), encode_ts(to));
    let changes = Arc::clone(&self.changes);
    let deleted = self
      .conn
      .call(move |conn| {
        let deleted = purge::delete_visits_in_range(conn, from_ms, to_ms)?;
        publish_if(&changes, deleted > 0);
        Ok(deleted)
      })
      .await?;

    tracing::info!(%from, %to, deleted, "deleted visits in range");
    Ok(deleted)
  }

  async fn delete_orphaned_sites(&self) -> Result<u64> {
    let changes = Arc::clone(&self.changes);
    let deleted = self
      .conn
      .call(move |conn| {
        let deleted = purge::delete_orphans(conn)?;
        publish_if(&changes, deleted > 0);
        Ok(deleted)
      })
      .await?;

    tracing::info!(deleted, "deleted orphaned sites");
    Ok(deleted)
  }

  async fn mark_for_deletion(&self, visit_id: Uuid, marked: bool) -> Result<()> {
    let id_str = encode_uuid(visit_id);
    let changes = Arc::clone(&self.changes);
    let changed = self
      .conn
      .call(move |conn| {
        let changed = purge::mark(conn, &id_str, marked)?;
        publish_if(&changes, changed > 0);
        Ok(changed)
      })
      .await?;

    if changed == 0 {
      tracing::debug!(%visit_id, marked, "mark for deletion changed nothing");
    }
    Ok(())
  }

  async fn purge_marked_for_deletion(&self) -> Result<u64> {
    let changes = Arc::clone(&self.changes);
    let deleted = self
      .conn
      .call(move |conn| {
        let deleted = purge::purge_marked(conn)?;
        publish_if(&changes, deleted > 0);
        Ok(deleted)
      })
      .await?;

    tracing::info!(deleted, "purged visits marked for deletion");
    Ok(deleted)
  }
}
