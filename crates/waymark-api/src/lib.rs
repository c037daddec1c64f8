//! JSON REST API for Waymark.
//!
//! Exposes an axum [`Router`] backed by any [`waymark_core::store::HistoryStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", waymark_api::api_router(ApiState::new(store.clone())))
//! ```

pub mod domains;
pub mod error;
pub mod favicons;
pub mod history;
pub mod live;
pub mod session;
pub mod sites;
pub mod suggestions;
pub mod visits;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use waymark_core::{
  domain::{DomainResolver, SuffixListResolver},
  session::SessionContext,
  store::HistoryStore,
  suggestion::SearchProvider,
};

pub use error::ApiError;

/// Everything the handlers need besides the request.
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub resolver: Arc<dyn DomainResolver>,
  pub search:   SearchProvider,
  pub session:  SessionContext,
}

impl<S> ApiState<S> {
  /// State with the built-in domain resolver, the default search provider,
  /// and a signed-out session.
  pub fn new(store: Arc<S>) -> Self {
    Self {
      store,
      resolver: Arc::new(SuffixListResolver::default()),
      search: SearchProvider::default(),
      session: SessionContext::default(),
    }
  }

  pub fn with_resolver(mut self, resolver: Arc<dyn DomainResolver>) -> Self {
    self.resolver = resolver;
    self
  }

  pub fn with_search(mut self, search: SearchProvider) -> Self {
    self.search = search;
    self
  }

  pub fn with_session(mut self, session: SessionContext) -> Self {
    self.session = session;
    self
  }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      resolver: Arc::clone(&self.resolver),
      search:   self.search.clone(),
      session:  self.session.clone(),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: HistoryStore + 'static,
{
  Router::new()
    // Visits
    .route(
      "/visits",
      get(visits::list::<S>)
        .post(visits::record::<S>)
        .delete(visits::delete_range::<S>),
    )
    .route("/visits/{id}/mark", put(visits::mark::<S>))
    .route("/visits/purge", post(visits::purge::<S>))
    // Sites
    .route("/sites", get(sites::list::<S>))
    .route("/sites/orphans", delete(sites::delete_orphans::<S>))
    .route("/sites/{id}", get(sites::get_one::<S>))
    // Ranked views
    .route("/history", get(history::window::<S>))
    .route("/history/grouped", get(history::grouped::<S>))
    .route("/frequent", get(history::frequent::<S>))
    .route("/suggestions", get(suggestions::handler::<S>))
    // Live views (server-sent events)
    .route("/live/history", get(live::history::<S>))
    .route("/live/frequent", get(live::frequent::<S>))
    .route("/live/suggestions", get(live::suggestions::<S>))
    .route("/live/sites", get(live::sites::<S>))
    // Domains and favicons
    .route("/domains", post(domains::record::<S>))
    .route("/favicons", put(favicons::store::<S>))
    .route("/favicons/{hash}", get(favicons::get_one::<S>))
    // Session
    .route(
      "/session",
      get(session::current::<S>)
        .put(session::sign_in::<S>)
        .delete(session::sign_out::<S>),
    )
    .with_state(state)
}

#[cfg(test)]
mod tests;
