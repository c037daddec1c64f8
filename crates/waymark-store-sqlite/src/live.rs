//! Live views over a [`SiteQuery`].
//!
//! Writers bump a generation counter in a `tokio::sync::watch` channel as
//! part of each committing call. A [`SiteSubscription`] turns the receiver
//! into a [`WatchStream`]; on every generation it re-runs its query and
//! yields the new result only if it differs from the last one delivered.

use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  Stream, StreamExt as _,
  stream::{self, BoxStream},
};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use waymark_core::{site::SiteRecord, store::SiteQuery};

use crate::{Result, encode::RawSite, queries};

/// A live view handed out by [`SqliteStore::subscribe`](crate::SqliteStore).
///
/// The subscription does not keep the store alive: once every store handle
/// is dropped, the stream ends.
pub struct SiteSubscription {
  query: SiteQuery,
  inner: BoxStream<'static, Result<Vec<SiteRecord>>>,
}

struct LiveQuery {
  conn:    tokio_rusqlite::Connection,
  query:   SiteQuery,
  changes: WatchStream<u64>,
  last:    Option<Vec<SiteRecord>>,
}

impl LiveQuery {
  async fn snapshot(&self) -> Result<Vec<SiteRecord>> {
    let query = self.query.clone();
    let raws: Vec<RawSite> = self
      .conn
      .call(move |conn| Ok(queries::run(conn, &query)?))
      .await?;
    raws.into_iter().map(RawSite::into_site).collect()
  }

  /// Wait for the next generation that changes the result.
  async fn next_change(&mut self) -> Result<Option<Vec<SiteRecord>>> {
    while self.changes.next().await.is_some() {
      let sites = self.snapshot().await?;
      if self.last.as_ref() == Some(&sites) {
        tracing::trace!(query = ?self.query, "change did not affect live view");
        continue;
      }
      self.last = Some(sites.clone());
      return Ok(Some(sites));
    }
    Ok(None)
  }
}

impl SiteSubscription {
  pub(crate) fn new(
    conn: tokio_rusqlite::Connection,
    query: SiteQuery,
    changes: watch::Receiver<u64>,
  ) -> Self {
    let live = LiveQuery {
      conn,
      query: query.clone(),
      changes: WatchStream::new(changes),
      last: None,
    };
    let inner = stream::unfold(live, |mut live| async move {
      let item = live.next_change().await.transpose()?;
      Some((item, live))
    })
    .boxed();
    Self { query, inner }
  }

  pub fn query(&self) -> &SiteQuery { &self.query }
}

impl Stream for SiteSubscription {
  type Item = Result<Vec<SiteRecord>>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.inner.poll_next_unpin(cx)
  }
}
