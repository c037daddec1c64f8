//! Scheduled history retention: periodically delete visits older than the
//! configured age, then the sites they leave without visits.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::{
  task::JoinHandle,
  time::{MissedTickBehavior, interval},
};
use waymark_core::store::HistoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
  /// Visits older than this many days are deleted.
  pub keep_days: u32,
  /// Time between passes; the first pass runs immediately.
  pub every:     Duration,
}

/// What one pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
  pub visits: u64,
  pub sites:  u64,
}

/// The instant before which visits are expired.
pub fn cutoff(now: DateTime<Utc>, keep_days: u32) -> DateTime<Utc> {
  now
    .checked_sub_signed(TimeDelta::days(i64::from(keep_days)))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Run a single retention pass relative to `now`.
pub async fn run_once<S>(
  store: &S,
  keep_days: u32,
  now: DateTime<Utc>,
) -> Result<RetentionReport, S::Error>
where
  S: HistoryStore,
{
  let visits = store
    .delete_visits_in_range(DateTime::<Utc>::MIN_UTC, cutoff(now, keep_days))
    .await?;
  let sites = store.delete_orphaned_sites().await?;
  Ok(RetentionReport { visits, sites })
}

/// Spawn the retention loop on the current runtime. Failures are logged and
/// retried on the next tick.
pub fn spawn<S>(store: Arc<S>, policy: RetentionPolicy) -> JoinHandle<()>
where
  S: HistoryStore + 'static,
{
  tokio::spawn(async move {
    let mut ticker = interval(policy.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      match run_once(store.as_ref(), policy.keep_days, Utc::now()).await {
        Ok(report) => tracing::info!(
          keep_days = policy.keep_days,
          visits = report.visits,
          sites = report.sites,
          "retention pass complete"
        ),
        Err(e) => tracing::warn!(error = %e, "retention pass failed"),
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use waymark_core::site::{NewVisit, Observation};
  use waymark_store_sqlite::SqliteStore;

  use super::*;

  fn day(n: u32) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(i64::from(n))
  }

  #[test]
  fn cutoff_is_keep_days_before_now() {
    assert_eq!(cutoff(day(40), 30), day(10));
    assert_eq!(cutoff(DateTime::<Utc>::MIN_UTC, 1), DateTime::<Utc>::MIN_UTC);
  }

  #[tokio::test]
  async fn expires_old_visits_and_orphans() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for (url, at) in [
      ("https://old.example/", day(1)),
      ("https://mixed.example/", day(2)),
      ("https://mixed.example/", day(35)),
      ("https://new.example/", day(39)),
    ] {
      store
        .record_visit(Observation::new(url).with_visit(NewVisit::at(at)))
        .await
        .unwrap();
    }

    let report = run_once(&store, 30, day(40)).await.unwrap();
    assert_eq!(report, RetentionReport { visits: 2, sites: 1 });

    let urls: Vec<String> = store
      .list_sites()
      .await
      .unwrap()
      .into_iter()
      .map(|s| s.url)
      .collect();
    assert_eq!(urls, ["https://mixed.example/", "https://new.example/"]);
  }
}
