//! The `HistoryStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `waymark-store-sqlite`).
//! Higher layers (`waymark-api`, `waymark-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use futures::Stream;
use uuid::Uuid;

use crate::{
  favicon::Favicon,
  history::{GroupedHistory, HistoryWindows},
  site::{DomainRecord, Observation, SiteRecord, VisitEntry},
};

// ─── Live queries ────────────────────────────────────────────────────────────

/// The read views that can be subscribed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteQuery {
  /// Sites with a visit in `[from, to)`, one row per visit, newest first.
  /// With `text`, only sites whose URL or title contains it.
  History {
    from: DateTime<Utc>,
    to:   DateTime<Utc>,
    text: Option<String>,
  },
  /// Sites visited since `since`, most visited first.
  Frequent { since: DateTime<Utc>, limit: usize },
  /// Sites whose URL or title contains `text` (case-sensitive), most visited
  /// first.
  Suggestions { text: String, limit: usize },
  /// Sites whose URL contains `text` and that have a visit not marked for
  /// deletion, most recently visited first.
  Recent { text: String, limit: usize },
  /// Every site in insertion order.
  AllSites,
}

/// What a store backend reports about a failure.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The request was rejected before anything was read or written.
  fn is_invalid_input(&self) -> bool;
}

/// A live view over a [`SiteQuery`].
///
/// The first item is the current result; later items arrive only when a
/// write changes the result. The stream ends when the store shuts down.
/// Dropping it cancels the subscription.
pub trait Subscription<E>:
  Stream<Item = Result<Vec<SiteRecord>, E>> + Send + Unpin + 'static
{
}

impl<T, E> Subscription<E> for T where
  T: Stream<Item = Result<Vec<SiteRecord>, E>> + Send + Unpin + 'static
{
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Waymark history store backend.
///
/// Every write is atomic. Writes to the same URL are serialised; readers never
/// observe two records for one URL or a visit without its site.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait HistoryStore: Send + Sync {
  type Error: StoreError;
  type Subscription: Subscription<Self::Error>;

  // ── Merge / upsert ────────────────────────────────────────────────────

  /// Create or merge the site for `observation.url` and, if a visit is
  /// attached, append it and bump the site's visit count.
  fn record_visit(
    &self,
    observation: Observation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Store icon bytes fetched for `url` and offer the icon to the site and
  /// its registered domain.
  fn store_favicon(
    &self,
    url: String,
    favicon: Favicon,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Create or update the registered domain of `url`.
  fn record_domain(
    &self,
    url: String,
    provider_name: Option<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_site(
    &self,
    site_id: Uuid,
  ) -> impl Future<Output = Result<Option<SiteRecord>, Self::Error>> + Send + '_;

  /// Look up a site by URL; the URL is normalised first.
  fn find_site(
    &self,
    url: String,
  ) -> impl Future<Output = Result<Option<SiteRecord>, Self::Error>> + Send + '_;

  fn list_sites(
    &self,
  ) -> impl Future<Output = Result<Vec<SiteRecord>, Self::Error>> + Send + '_;

  /// Every visit, newest first.
  fn list_visits(
    &self,
  ) -> impl Future<Output = Result<Vec<VisitEntry>, Self::Error>> + Send + '_;

  fn get_favicon(
    &self,
    hash: String,
  ) -> impl Future<Output = Result<Option<Favicon>, Self::Error>> + Send + '_;

  /// Run any [`SiteQuery`] once.
  fn query(
    &self,
    query: SiteQuery,
  ) -> impl Future<Output = Result<Vec<SiteRecord>, Self::Error>> + Send + '_;

  fn history_in_window(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<SiteRecord>, Self::Error>> + Send + '_ {
    self.query(SiteQuery::History { from, to, text: None })
  }

  fn frequent_sites(
    &self,
    since: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SiteRecord>, Self::Error>> + Send + '_ {
    self.query(SiteQuery::Frequent { since, limit })
  }

  fn suggestions(
    &self,
    text: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SiteRecord>, Self::Error>> + Send + '_ {
    self.query(SiteQuery::Suggestions { text, limit })
  }

  /// Recently visited sites whose URL contains `text`, newest first.
  fn recent_sites(
    &self,
    text: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SiteRecord>, Self::Error>> + Send + '_ {
    self.query(SiteQuery::Recent { text, limit })
  }

  /// History for the [`HistoryWindows`] relative to `now`.
  fn grouped_history(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<GroupedHistory, Self::Error>> + Send + '_ {
    async move {
      let windows = HistoryWindows::at(now);
      Ok(GroupedHistory {
        today:     self.history_in_window(windows.today.from, windows.today.to).await?,
        yesterday: self
          .history_in_window(windows.yesterday.from, windows.yesterday.to)
          .await?,
        this_week: self
          .history_in_window(windows.this_week.from, windows.this_week.to)
          .await?,
      })
    }
  }

  /// Registered domains starting with `prefix`, alphabetically.
  fn domain_suggestions(
    &self,
    prefix: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<DomainRecord>, Self::Error>> + Send + '_;

  /// Subscribe to a live view of `query`.
  fn subscribe(&self, query: SiteQuery) -> Self::Subscription;

  // ── Retention ─────────────────────────────────────────────────────────

  /// Delete every visit with a timestamp in `[from, to)`. Sites left without
  /// visits remain until [`delete_orphaned_sites`](Self::delete_orphaned_sites).
  fn delete_visits_in_range(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Delete every site with no remaining visits; returns how many.
  fn delete_orphaned_sites(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Flag or unflag a visit for later purging. Unknown ids are ignored.
  fn mark_for_deletion(
    &self,
    visit_id: Uuid,
    marked: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete exactly the visits currently flagged; returns how many.
  fn purge_marked_for_deletion(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
