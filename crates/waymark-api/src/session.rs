//! Handlers for `/session`: read and replace the signed-in user snapshot.

use axum::{Json, extract::State, http::StatusCode};
use waymark_core::{
  session::{UserInfo, UserSnapshot},
  store::HistoryStore,
};

use crate::{ApiState, error::ApiError};

/// `GET /session`
pub async fn current<S>(State(state): State<ApiState<S>>) -> Json<UserSnapshot>
where
  S: HistoryStore,
{
  Json(state.session.current())
}

/// `PUT /session`: body: [`UserInfo`].
pub async fn sign_in<S>(
  State(state): State<ApiState<S>>,
  Json(user): Json<UserInfo>,
) -> Result<Json<UserSnapshot>, ApiError>
where
  S: HistoryStore,
{
  if user.user_id.trim().is_empty() {
    return Err(ApiError::BadRequest("user_id must not be empty".to_owned()));
  }
  tracing::info!(user_id = %user.user_id, "signed in");
  state.session.sign_in(user);
  Ok(Json(state.session.current()))
}

/// `DELETE /session`
pub async fn sign_out<S>(State(state): State<ApiState<S>>) -> StatusCode
where
  S: HistoryStore,
{
  state.session.sign_out();
  tracing::info!("signed out");
  StatusCode::NO_CONTENT
}
