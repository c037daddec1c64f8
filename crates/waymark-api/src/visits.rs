//! Handlers for `/visits` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/visits` | Body: [`VisitBody`]; returns 201 + the merged site |
//! | `GET`    | `/visits` | Every visit, newest first |
//! | `DELETE` | `/visits` | `?from=&to=` (RFC 3339); returns `{"deleted": n}` |
//! | `PUT`    | `/visits/{id}/mark` | Body: `{"marked": bool}`; unknown ids are ignored |
//! | `POST`   | `/visits/purge` | Deletes every marked visit; returns `{"deleted": n}` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use waymark_core::{
  normalize_url,
  site::{NewVisit, Observation, VisitEntry, VisitType},
  store::HistoryStore,
};

use crate::{ApiState, error::ApiError};

/// Count of rows removed by a retention call.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deleted {
  pub deleted: u64,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /visits`.
#[derive(Debug, Deserialize)]
pub struct VisitBody {
  pub url:            String,
  pub title:          Option<String>,
  pub icon_reference: Option<String>,
  /// Defaults to the time the request is handled.
  pub timestamp:      Option<DateTime<Utc>>,
  #[serde(default)]
  pub visit_type:     VisitType,
  #[serde(default)]
  pub root_id:        i64,
  /// Merge title and icon only, without counting a visit.
  #[serde(default)]
  pub metadata_only:  bool,
}

impl From<VisitBody> for Observation {
  fn from(b: VisitBody) -> Self {
    let visit = (!b.metadata_only).then(|| NewVisit {
      timestamp:  b.timestamp,
      visit_type: b.visit_type,
      root_id:    b.root_id,
    });
    Observation {
      url: b.url,
      title: b.title,
      icon_reference: b.icon_reference,
      visit,
    }
  }
}

/// `POST /visits`: returns 201 + the [`SiteRecord`](waymark_core::site::SiteRecord)
/// after the merge.
pub async fn record<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<VisitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HistoryStore,
{
  let url = normalize_url(&body.url)?;
  state
    .store
    .record_visit(Observation::from(body))
    .await
    .map_err(ApiError::store)?;

  let site = state
    .store
    .find_site(url.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("site {url} not found")))?;
  Ok((StatusCode::CREATED, Json(site)))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /visits`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<VisitEntry>>, ApiError>
where
  S: HistoryStore,
{
  let visits = state
    .store
    .list_visits()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(visits))
}

// ─── Delete range ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub from: DateTime<Utc>,
  pub to:   DateTime<Utc>,
}

/// `DELETE /visits?from=<rfc3339>&to=<rfc3339>`: deletes visits in
/// `[from, to)`.
pub async fn delete_range<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<RangeParams>,
) -> Result<Json<Deleted>, ApiError>
where
  S: HistoryStore,
{
  if params.from > params.to {
    return Err(ApiError::BadRequest("`from` is after `to`".to_owned()));
  }
  let deleted = state
    .store
    .delete_visits_in_range(params.from, params.to)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Deleted { deleted }))
}

// ─── Mark / purge ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MarkBody {
  #[serde(default = "marked_default")]
  pub marked: bool,
}

fn marked_default() -> bool { true }

/// `PUT /visits/{id}/mark`: body: `{"marked": true}` (default) or `false`.
pub async fn mark<S>(
  State(state): State<ApiState<S>>,
  Path(visit_id): Path<Uuid>,
  Json(body): Json<MarkBody>,
) -> Result<StatusCode, ApiError>
where
  S: HistoryStore,
{
  state
    .store
    .mark_for_deletion(visit_id, body.marked)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /visits/purge`
pub async fn purge<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Deleted>, ApiError>
where
  S: HistoryStore,
{
  let deleted = state
    .store
    .purge_marked_for_deletion()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Deleted { deleted }))
}
