//! Handler for `/domains`: remember a registered domain and its provider name.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use waymark_core::{normalize_url, store::HistoryStore};

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct DomainBody {
  /// Any URL on the domain; its registered domain is what gets stored.
  pub url:           String,
  pub provider_name: Option<String>,
}

/// `POST /domains`: 204 on success, also when the URL has no registered
/// domain (IP hosts, bare suffixes).
pub async fn record<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<DomainBody>,
) -> Result<StatusCode, ApiError>
where
  S: HistoryStore,
{
  normalize_url(&body.url)?;
  state
    .store
    .record_domain(body.url, body.provider_name)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
