//! Handlers for the time-based views: `/history`, `/history/grouped` and
//! `/frequent`.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use waymark_core::{
  history::GroupedHistory,
  site::SiteRecord,
  store::{HistoryStore, SiteQuery},
};

use crate::{ApiState, error::ApiError};

/// Number of frequent sites returned when `limit` is absent.
pub const DEFAULT_FREQUENT_LIMIT: usize = 8;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub from: DateTime<Utc>,
  pub to:   DateTime<Utc>,
  /// Only visits to sites whose URL or title contains this text.
  pub q:    Option<String>,
}

impl HistoryParams {
  pub fn into_query(self) -> Result<SiteQuery, ApiError> {
    if self.from > self.to {
      return Err(ApiError::BadRequest("`from` is after `to`".to_owned()));
    }
    Ok(SiteQuery::History {
      from: self.from,
      to:   self.to,
      text: self.q.filter(|q| !q.is_empty()),
    })
  }
}

/// `GET /history?from=<rfc3339>&to=<rfc3339>[&q=<text>]`: one entry per
/// visit in `[from, to)`, newest first.
pub async fn window<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SiteRecord>>, ApiError>
where
  S: HistoryStore,
{
  let sites = state
    .store
    .query(params.into_query()?)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sites))
}

#[derive(Debug, Deserialize, Default)]
pub struct GroupedParams {
  /// Reference point for the day buckets. Defaults to now.
  pub now: Option<DateTime<Utc>>,
}

/// `GET /history/grouped[?now=<rfc3339>]`
pub async fn grouped<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<GroupedParams>,
) -> Result<Json<GroupedHistory>, ApiError>
where
  S: HistoryStore,
{
  let grouped = state
    .store
    .grouped_history(params.now.unwrap_or_else(Utc::now))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(grouped))
}

#[derive(Debug, Deserialize, Default)]
pub struct FrequentParams {
  /// Only sites visited at or after this instant. Defaults to the epoch.
  pub since: Option<DateTime<Utc>>,
  pub limit: Option<usize>,
}

impl FrequentParams {
  pub fn into_query(self) -> SiteQuery {
    SiteQuery::Frequent {
      since: self.since.unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
      limit: self.limit.unwrap_or(DEFAULT_FREQUENT_LIMIT),
    }
  }
}

/// `GET /frequent[?since=<rfc3339>][&limit=n]`
pub async fn frequent<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<FrequentParams>,
) -> Result<Json<Vec<SiteRecord>>, ApiError>
where
  S: HistoryStore,
{
  let sites = state
    .store
    .query(params.into_query())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sites))
}
