//! Async HTTP client wrapping the waymark JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use waymark_core::{
  favicon::Favicon,
  history::GroupedHistory,
  site::{SiteRecord, VisitEntry, VisitType},
  suggestion::Suggestion,
};

/// Connection settings for the waymark API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Body of `POST /api/visits`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VisitRequest {
  pub url:           String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timestamp:     Option<DateTime<Utc>>,
  pub visit_type:    VisitType,
  pub root_id:       i64,
  pub metadata_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct Suggestions {
  pub autocomplete:   Option<Suggestion>,
  pub suggestions:    Vec<Suggestion>,
  #[serde(default)]
  pub recent_queries: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Deleted {
  deleted: u64,
}

/// Async HTTP client for the waymark JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!(
      "{}/api{}",
      self.config.base_url.trim_end_matches('/'),
      path
    )
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  /// Send `req`, turning a non-2xx status into an error carrying the
  /// server's `{"error": ...}` message.
  async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> Result<Response> {
    let resp = self
      .auth(req)
      .send()
      .await
      .with_context(|| format!("{what} failed"))?;
    tracing::debug!(status = %resp.status(), "{what}");

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<serde_json::Value>()
      .await
      .ok()
      .and_then(|v| v["error"].as_str().map(str::to_owned))
      .unwrap_or_default();
    Err(anyhow!("{what} → {status} {message}"))
  }

  // ── Visits ────────────────────────────────────────────────────────────────

  /// `POST /api/visits`
  pub async fn record_visit(&self, visit: &VisitRequest) -> Result<SiteRecord> {
    self
      .send(self.client.post(self.url("/visits")).json(visit), "POST /visits")
      .await?
      .json()
      .await
      .context("deserialising site")
  }

  /// `GET /api/visits`
  pub async fn list_visits(&self) -> Result<Vec<VisitEntry>> {
    self
      .send(self.client.get(self.url("/visits")), "GET /visits")
      .await?
      .json()
      .await
      .context("deserialising visits")
  }

  /// `DELETE /api/visits?from=&to=`
  pub async fn delete_visits(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u64> {
    let deleted: Deleted = self
      .send(
        self
          .client
          .delete(self.url("/visits"))
          .query(&[("from", from.to_rfc3339()), ("to", to.to_rfc3339())]),
        "DELETE /visits",
      )
      .await?
      .json()
      .await
      .context("deserialising delete count")?;
    Ok(deleted.deleted)
  }

  /// `PUT /api/visits/{id}/mark`
  pub async fn mark(&self, visit_id: Uuid, marked: bool) -> Result<()> {
    self
      .send(
        self
          .client
          .put(self.url(&format!("/visits/{visit_id}/mark")))
          .json(&json!({ "marked": marked })),
        "PUT /visits/{id}/mark",
      )
      .await?;
    Ok(())
  }

  /// `POST /api/visits/purge`
  pub async fn purge(&self) -> Result<u64> {
    let deleted: Deleted = self
      .send(self.client.post(self.url("/visits/purge")), "POST /visits/purge")
      .await?
      .json()
      .await
      .context("deserialising purge count")?;
    Ok(deleted.deleted)
  }

  // ── Sites ─────────────────────────────────────────────────────────────────

  /// `GET /api/sites`
  pub async fn list_sites(&self) -> Result<Vec<SiteRecord>> {
    self
      .send(self.client.get(self.url("/sites")), "GET /sites")
      .await?
      .json()
      .await
      .context("deserialising sites")
  }

  /// `DELETE /api/sites/orphans`
  pub async fn delete_orphans(&self) -> Result<u64> {
    let deleted: Deleted = self
      .send(self.client.delete(self.url("/sites/orphans")), "DELETE /sites/orphans")
      .await?
      .json()
      .await
      .context("deserialising delete count")?;
    Ok(deleted.deleted)
  }

  // ── Views ─────────────────────────────────────────────────────────────────

  /// `GET /api/history?from=&to=[&q=]`
  pub async fn history(
    &self,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    filter: Option<&str>,
  ) -> Result<Vec<SiteRecord>> {
    let mut query = vec![("from", from.to_rfc3339()), ("to", to.to_rfc3339())];
    if let Some(filter) = filter {
      query.push(("q", filter.to_owned()));
    }
    self
      .send(
        self.client.get(self.url("/history")).query(&query),
        "GET /history",
      )
      .await?
      .json()
      .await
      .context("deserialising history")
  }

  /// `GET /api/history/grouped`
  pub async fn grouped_history(&self) -> Result<GroupedHistory> {
    self
      .send(self.client.get(self.url("/history/grouped")), "GET /history/grouped")
      .await?
      .json()
      .await
      .context("deserialising grouped history")
  }

  /// `GET /api/frequent?since=&limit=`
  pub async fn frequent(&self, since: Option<DateTime<Utc>>, limit: usize) -> Result<Vec<SiteRecord>> {
    let mut query = vec![("limit", limit.to_string())];
    if let Some(since) = since {
      query.push(("since", since.to_rfc3339()));
    }
    self
      .send(self.client.get(self.url("/frequent")).query(&query), "GET /frequent")
      .await?
      .json()
      .await
      .context("deserialising frequent sites")
  }

  /// `GET /api/suggestions?q=&limit=`
  pub async fn suggestions(&self, text: &str, limit: usize) -> Result<Suggestions> {
    self
      .send(
        self
          .client
          .get(self.url("/suggestions"))
          .query(&[("q", text.to_owned()), ("limit", limit.to_string())]),
        "GET /suggestions",
      )
      .await?
      .json()
      .await
      .context("deserialising suggestions")
  }

  // ── Domains and favicons ──────────────────────────────────────────────────

  /// `POST /api/domains`
  pub async fn record_domain(&self, url: &str, provider_name: Option<&str>) -> Result<()> {
    self
      .send(
        self
          .client
          .post(self.url("/domains"))
          .json(&json!({ "url": url, "provider_name": provider_name })),
        "POST /domains",
      )
      .await?;
    Ok(())
  }

  /// `PUT /api/favicons?url=&width=&height=`
  pub async fn store_favicon(
    &self,
    page: &str,
    media_type: &str,
    width: u32,
    height: u32,
    data: Vec<u8>,
  ) -> Result<Favicon> {
    self
      .send(
        self
          .client
          .put(self.url("/favicons"))
          .query(&[
            ("url", page.to_owned()),
            ("width", width.to_string()),
            ("height", height.to_string()),
          ])
          .header(reqwest::header::CONTENT_TYPE, media_type)
          .body(data),
        "PUT /favicons",
      )
      .await?
      .json()
      .await
      .context("deserialising favicon")
  }
}
