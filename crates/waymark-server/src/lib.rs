//! HTTP server for Waymark.
//!
//! Serves the JSON API from `waymark-api` under `/api`, guarded by HTTP Basic
//! auth, plus an unauthenticated `/health` check.

pub mod auth;
pub mod error;
pub mod retention;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Json, Router, middleware, routing::get};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use waymark_api::ApiState;
use waymark_core::{store::HistoryStore, suggestion::SearchProvider};

use auth::{AuthConfig, require_auth};
use retention::RetentionPolicy;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `WAYMARK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                    String,
  #[serde(default = "default_port")]
  pub port:                    u16,
  pub store_path:              PathBuf,
  pub auth_username:           String,
  pub auth_password_hash:      String,
  /// Results-page prefix of the search provider, see [`SearchProvider`].
  pub search_url:              Option<String>,
  pub search_param:            Option<String>,
  /// Delete visits older than this many days. Unset keeps history forever.
  pub retention_days:          Option<u32>,
  #[serde(default = "default_retention_interval")]
  pub retention_interval_secs: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5280 }

fn default_retention_interval() -> u64 { 60 * 60 }

impl ServerConfig {
  pub fn search_provider(&self) -> SearchProvider {
    let default = SearchProvider::default();
    SearchProvider {
      results_url: self.search_url.clone().unwrap_or(default.results_url),
      query_param: self.search_param.clone().unwrap_or(default.query_param),
    }
  }

  pub fn retention_policy(&self) -> Option<RetentionPolicy> {
    self.retention_days.map(|keep_days| RetentionPolicy {
      keep_days,
      every: Duration::from_secs(self.retention_interval_secs.max(1)),
    })
  }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      username:      self.auth_username.clone(),
      password_hash: self.auth_password_hash.clone(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the router.
pub struct AppState<S> {
  pub api:  ApiState<S>,
  pub auth: Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { api: self.api.clone(), auth: Arc::clone(&self.auth) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the server's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: HistoryStore + 'static,
{
  let api = waymark_api::api_router(state.api)
    .layer(middleware::from_fn_with_state(state.auth, require_auth));

  Router::new()
    .route("/health", get(health))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
  Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
