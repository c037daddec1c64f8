//! Handlers for `/favicons`: the icon-fetch callback and raw icon reads.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/favicons?url=&width=&height=` | Raw image body; `Content-Type` is stored as the media type |
//! | `GET`  | `/favicons/{hash}` | Raw image bytes |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use serde::Deserialize;
use waymark_core::{favicon::Favicon, normalize_url, store::HistoryStore};

use crate::{ApiState, error::ApiError};

/// Media type recorded when the request carries no `Content-Type`.
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct StoreParams {
  /// The page the icon was fetched for.
  pub url:    String,
  pub width:  u32,
  pub height: u32,
}

/// `PUT /favicons?url=<page>&width=<px>&height=<px>`: returns 201 + the
/// stored icon's metadata.
pub async fn store<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<StoreParams>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: HistoryStore,
{
  let url = normalize_url(&params.url)?;
  let media_type = headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .unwrap_or(FALLBACK_MEDIA_TYPE);
  let favicon = Favicon::from_bytes(media_type, params.width, params.height, body.to_vec())?;

  state
    .store
    .store_favicon(url, favicon.clone())
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(favicon)))
}

/// `GET /favicons/{hash}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(hash): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: HistoryStore,
{
  let favicon = state
    .store
    .get_favicon(hash.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("favicon {hash} not found")))?;

  Ok((
    [
      (header::CONTENT_TYPE, favicon.media_type),
      (header::ETAG, format!("\"{}\"", favicon.hash)),
    ],
    favicon.data,
  ))
}
