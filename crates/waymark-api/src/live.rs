//! Server-sent event feeds over live views: `/live/history`,
//! `/live/frequent`, `/live/suggestions` and `/live/sites`.
//!
//! Each connection holds one store subscription. The first `sites` event
//! carries the current result; later events are sent only when a write
//! changes it.

use std::convert::Infallible;

use axum::{
  extract::{Query, State},
  response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt as _};
use waymark_core::{
  site::SiteRecord,
  store::{HistoryStore, SiteQuery, StoreError},
};

use crate::{
  ApiState,
  error::ApiError,
  history::{FrequentParams, HistoryParams},
  suggestions::{DEFAULT_SUGGESTION_LIMIT, SuggestionParams},
};

fn events<St, E>(sub: St) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  St: Stream<Item = Result<Vec<SiteRecord>, E>> + Send + 'static,
  E: StoreError,
{
  let events = sub.filter_map(|result| async move {
    let sites = match result {
      Ok(sites) => sites,
      Err(err) => {
        tracing::warn!(error = %err, "live view query failed");
        return None;
      }
    };
    match Event::default().event("sites").json_data(&sites) {
      Ok(event) => Some(Ok::<_, Infallible>(event)),
      Err(err) => {
        tracing::error!(error = %err, "failed to serialise live view");
        None
      }
    }
  });
  Sse::new(events).keep_alive(KeepAlive::default())
}

/// `GET /live/history?from=&to=[&q=]`
pub async fn history<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<HistoryParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: HistoryStore,
{
  Ok(events(state.store.subscribe(params.into_query()?)))
}

/// `GET /live/frequent[?since=][&limit=]`
pub async fn frequent<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<FrequentParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: HistoryStore,
{
  events(state.store.subscribe(params.into_query()))
}

/// `GET /live/suggestions?q=[&limit=]`: matching sites only; domains and
/// recent searches are not streamed.
pub async fn suggestions<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SuggestionParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError>
where
  S: HistoryStore,
{
  if params.q.trim().is_empty() {
    return Err(ApiError::BadRequest("`q` is empty".to_owned()));
  }
  Ok(events(state.store.subscribe(SiteQuery::Suggestions {
    text:  params.q,
    limit: params.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT),
  })))
}

/// `GET /live/sites`
pub async fn sites<S>(
  State(state): State<ApiState<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
  S: HistoryStore,
{
  events(state.store.subscribe(SiteQuery::AllSites))
}
