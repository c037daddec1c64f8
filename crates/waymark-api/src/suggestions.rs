//! Handler for `GET /suggestions`.
//!
//! Matching sites are projected into [`Suggestion`] values; the first
//! registered domain that starts with the typed text becomes the inline
//! autocompletion. The most recent searches made with the configured
//! [`SearchProvider`] are returned alongside, even for empty text.

use axum::{
  Json,
  extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use waymark_core::{
  store::HistoryStore,
  suggestion::{QuerySuggestion, SearchProvider, Suggestion},
};

use crate::{ApiState, error::ApiError};

/// Number of suggestions returned when `limit` is absent.
pub const DEFAULT_SUGGESTION_LIMIT: usize = 10;

/// Number of recent searches offered.
pub const RECENT_QUERY_LIMIT: usize = 3;

#[derive(Debug, Deserialize, Default)]
pub struct SuggestionParams {
  /// Text typed so far; matched case-sensitively against URL and title.
  #[serde(default)]
  pub q:     String,
  pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionsResponse {
  pub autocomplete:   Option<Suggestion>,
  pub suggestions:    Vec<Suggestion>,
  pub recent_queries: Vec<Suggestion>,
}

/// The latest searches made with `search`, newest first.
async fn recent_queries<S>(store: &S, search: &SearchProvider) -> Result<Vec<Suggestion>, ApiError>
where
  S: HistoryStore,
{
  // Sites without a query parameter are skipped, so over-fetch a little.
  let sites = store
    .recent_sites(search.results_url.clone(), RECENT_QUERY_LIMIT * 2)
    .await
    .map_err(ApiError::store)?;
  Ok(
    sites
      .into_iter()
      .filter_map(|site| {
        let query = search.query_of(&site.url)?;
        Some(Suggestion::Query(QuerySuggestion { url: site.url, query }))
      })
      .take(RECENT_QUERY_LIMIT)
      .collect(),
  )
}

/// `GET /suggestions?q=<text>[&limit=n]`
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SuggestionParams>,
) -> Result<Json<SuggestionsResponse>, ApiError>
where
  S: HistoryStore,
{
  let recent_queries = recent_queries(state.store.as_ref(), &state.search).await?;
  if params.q.trim().is_empty() {
    return Ok(Json(SuggestionsResponse {
      autocomplete: None,
      suggestions: Vec::new(),
      recent_queries,
    }));
  }
  let limit = params.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);

  let sites = state
    .store
    .suggestions(params.q.clone(), limit)
    .await
    .map_err(ApiError::store)?;
  let domains = state
    .store
    .domain_suggestions(params.q, 1)
    .await
    .map_err(ApiError::store)?;

  let suggestions = sites
    .iter()
    .map(|site| Suggestion::from_site(site, state.resolver.as_ref(), &state.search))
    .collect();

  Ok(Json(SuggestionsResponse {
    autocomplete: domains.first().map(Suggestion::from_domain),
    suggestions,
    recent_queries,
  }))
}
