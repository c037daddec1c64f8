//! Handlers for `/sites` endpoints.

use axum::{
  Json,
  extract::{Path, State},
};
use uuid::Uuid;
use waymark_core::{site::SiteRecord, store::HistoryStore};

use crate::{ApiState, error::ApiError, visits::Deleted};

/// `GET /sites`: every site in insertion order.
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<SiteRecord>>, ApiError>
where
  S: HistoryStore,
{
  let sites = state
    .store
    .list_sites()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(sites))
}

/// `GET /sites/{id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<SiteRecord>, ApiError>
where
  S: HistoryStore,
{
  let site = state
    .store
    .get_site(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("site {id} not found")))?;
  Ok(Json(site))
}

/// `DELETE /sites/orphans`: removes sites without any remaining visit.
pub async fn delete_orphans<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Deleted>, ApiError>
where
  S: HistoryStore,
{
  let deleted = state
    .store
    .delete_orphaned_sites()
    .await
    .map_err(ApiError::store)?;
  Ok(Json(Deleted { deleted }))
}
