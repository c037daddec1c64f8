//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use futures::StreamExt as _;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;
use waymark_store_sqlite::SqliteStore;

use crate::{ApiError, ApiState, api_router};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  api_router(ApiState::new(Arc::new(store)))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
  let resp = app.clone().oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, body)
}

fn get(uri: &str) -> Request<Body> {
  Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
  Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, "application/json")
    .body(Body::from(body.to_string()))
    .unwrap()
}

fn without_body(method: &str, uri: &str) -> Request<Body> {
  Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

async fn visit(app: &Router, url: &str, at: &str) -> Value {
  let (status, site) = send(
    app,
    with_json("POST", "/visits", json!({ "url": url, "timestamp": at })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  site
}

fn urls(list: &Value) -> Vec<&str> {
  list
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["url"].as_str().unwrap())
    .collect()
}

// ─── Visits ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_returns_merged_site() {
  let app = app().await;
  visit(&app, "https://www.a.com", "1970-01-01T00:00:10Z").await;
  let site = visit(&app, "https://www.a.com/", "1970-01-01T00:00:20Z").await;

  assert_eq!(site["url"], "https://www.a.com/");
  assert_eq!(site["visit_count"], 2);
  assert_eq!(site["last_visit_timestamp"], "1970-01-01T00:00:20Z");
}

#[tokio::test]
async fn invalid_url_is_bad_request() {
  let app = app().await;
  let (status, body) = send(
    &app,
    with_json("POST", "/visits", json!({ "url": "not a url" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("not a url"));

  let (_, sites) = send(&app, get("/sites")).await;
  assert_eq!(sites, json!([]));
}

#[tokio::test]
async fn metadata_only_does_not_count() {
  let app = app().await;
  let (status, site) = send(
    &app,
    with_json(
      "POST",
      "/visits",
      json!({ "url": "https://a.example/", "title": "A", "metadata_only": true }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(site["visit_count"], 0);
  assert_eq!(site["title"], "A");
}

#[tokio::test]
async fn mark_and_purge() {
  let app = app().await;
  visit(&app, "https://a.example/", "1970-01-01T00:00:01Z").await;
  visit(&app, "https://a.example/", "1970-01-01T00:00:02Z").await;

  let (_, visits) = send(&app, get("/visits")).await;
  let newest = visits[0]["visit_id"].as_str().unwrap().to_owned();

  let (status, _) = send(
    &app,
    with_json("PUT", &format!("/visits/{newest}/mark"), json!({ "marked": true })),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  // Unknown visits are ignored.
  let (status, _) = send(
    &app,
    with_json("PUT", &format!("/visits/{}/mark", Uuid::new_v4()), json!({})),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, purged) = send(&app, without_body("POST", "/visits/purge")).await;
  assert_eq!(purged, json!({ "deleted": 1 }));

  let (_, visits) = send(&app, get("/visits")).await;
  assert_eq!(visits.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn delete_range_and_orphans() {
  let app = app().await;
  visit(&app, "https://old.example/", "1970-01-01T00:00:01Z").await;
  visit(&app, "https://new.example/", "1970-01-01T00:01:00Z").await;

  let (status, deleted) = send(
    &app,
    without_body(
      "DELETE",
      "/visits?from=1970-01-01T00:00:00Z&to=1970-01-01T00:00:30Z",
    ),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(deleted, json!({ "deleted": 1 }));

  let (_, orphans) = send(&app, without_body("DELETE", "/sites/orphans")).await;
  assert_eq!(orphans, json!({ "deleted": 1 }));

  let (_, sites) = send(&app, get("/sites")).await;
  assert_eq!(urls(&sites), ["https://new.example/"]);
}

#[tokio::test]
async fn reversed_range_is_bad_request() {
  let app = app().await;
  let (status, _) = send(
    &app,
    without_body(
      "DELETE",
      "/visits?from=1970-01-01T00:01:00Z&to=1970-01-01T00:00:00Z",
    ),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Sites & views ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_site_is_not_found() {
  let app = app().await;
  let (status, body) = send(&app, get(&format!("/sites/{}", Uuid::new_v4()))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn get_site_by_id() {
  let app = app().await;
  let site = visit(&app, "https://a.example/", "1970-01-01T00:00:01Z").await;
  let id = site["site_id"].as_str().unwrap();

  let (status, fetched) = send(&app, get(&format!("/sites/{id}"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched, site);
}

#[tokio::test]
async fn frequent_and_history_views() {
  let app = app().await;
  for at in ["1970-01-01T00:00:10Z", "1970-01-01T00:00:11Z", "1970-01-01T00:00:12Z"] {
    visit(&app, "https://www.a.com", at).await;
  }
  for at in ["1970-01-01T00:00:20Z", "1970-01-01T00:00:21Z"] {
    visit(&app, "https://www.b.com", at).await;
  }
  visit(&app, "https://www.c.com", "1970-01-01T00:00:30Z").await;

  let (_, frequent) = send(&app, get("/frequent?limit=3")).await;
  assert_eq!(
    urls(&frequent),
    ["https://www.a.com/", "https://www.b.com/", "https://www.c.com/"]
  );

  let (_, history) = send(
    &app,
    get("/history?from=1970-01-01T00:00:12Z&to=1970-01-01T00:00:30Z"),
  )
  .await;
  assert_eq!(
    urls(&history),
    ["https://www.b.com/", "https://www.b.com/", "https://www.a.com/"]
  );
}

#[tokio::test]
async fn history_text_filter() {
  let app = app().await;
  visit(&app, "https://docs.rs/serde", "1970-01-01T00:00:01Z").await;
  visit(&app, "https://crates.io/", "1970-01-01T00:00:02Z").await;

  let (status, history) = send(
    &app,
    get("/history?from=1970-01-01T00:00:00Z&to=1970-01-01T00:01:00Z&q=docs"),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(urls(&history), ["https://docs.rs/serde"]);

  let (_, history) = send(
    &app,
    get("/history?from=1970-01-01T00:00:00Z&to=1970-01-01T00:01:00Z&q="),
  )
  .await;
  assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn grouped_history_uses_now_param() {
  let app = app().await;
  visit(&app, "https://today.example/", "2024-03-10T09:00:00Z").await;
  visit(&app, "https://yesterday.example/", "2024-03-09T09:00:00Z").await;

  let (status, grouped) = send(&app, get("/history/grouped?now=2024-03-10T12:00:00Z")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(urls(&grouped["today"]), ["https://today.example/"]);
  assert_eq!(urls(&grouped["yesterday"]), ["https://yesterday.example/"]);
  assert_eq!(grouped["this_week"], json!([]));
}

// ─── Suggestions & favicons ──────────────────────────────────────────────────

fn put_icon(page: &str, width: u32, bytes: &'static [u8]) -> Request<Body> {
  Request::builder()
    .method("PUT")
    .uri(format!("/favicons?url={page}&width={width}&height={width}"))
    .header(header::CONTENT_TYPE, "image/png")
    .body(Body::from(bytes))
    .unwrap()
}

#[tokio::test]
async fn suggestions_project_sites_and_domains() {
  let app = app().await;
  send(
    &app,
    with_json(
      "POST",
      "/visits",
      json!({ "url": "https://www.rust-lang.org/learn", "title": "Learn Rust" }),
    ),
  )
  .await;
  visit(&app, "https://duckduckgo.com/?q=rust+book", "1970-01-01T00:00:01Z").await;
  let (status, _) = send(&app, put_icon("https://www.rust-lang.org/", 32, b"icon")).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = send(&app, get("/suggestions?q=rust")).await;
  assert_eq!(status, StatusCode::OK);

  let autocomplete = &body["autocomplete"];
  assert_eq!(autocomplete["kind"], "navigation");
  assert_eq!(autocomplete["url"], "https://www.rust-lang.org/");

  let suggestions = body["suggestions"].as_array().unwrap();
  assert!(suggestions.iter().any(|s| s["kind"] == "query" && s["query"] == "rust book"));
  assert!(
    suggestions
      .iter()
      .any(|s| s["kind"] == "navigation" && s["label"] == "Learn Rust")
  );
}

#[tokio::test]
async fn recorded_domain_labels_autocomplete() {
  let app = app().await;
  let (status, _) = send(
    &app,
    with_json(
      "POST",
      "/domains",
      json!({ "url": "https://www.duckduckgo.com/", "provider_name": "DuckDuckGo" }),
    ),
  )
  .await;
  assert_eq!(status, StatusCode::NO_CONTENT);

  let (_, body) = send(&app, get("/suggestions?q=duck")).await;
  assert_eq!(body["autocomplete"]["label"], "DuckDuckGo");
  assert_eq!(body["autocomplete"]["secondary_label"], "duckduckgo.com");

  let (status, _) = send(&app, with_json("POST", "/domains", json!({ "url": "nope" }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_query_has_no_suggestions() {
  let app = app().await;
  visit(&app, "https://a.example/", "1970-01-01T00:00:01Z").await;
  let (_, body) = send(&app, get("/suggestions?q=")).await;
  assert_eq!(
    body,
    json!({ "autocomplete": null, "suggestions": [], "recent_queries": [] })
  );
}

#[tokio::test]
async fn recent_searches_are_offered_newest_first() {
  let app = app().await;
  for (i, q) in ["one", "two", "three", "four"].into_iter().enumerate() {
    visit(
      &app,
      &format!("https://duckduckgo.com/?q={q}"),
      &format!("1970-01-01T00:00:0{}Z", i + 1),
    )
    .await;
  }
  visit(&app, "https://duckduckgo.com/about", "1970-01-01T00:00:09Z").await;

  let (status, body) = send(&app, get("/suggestions?q=")).await;
  assert_eq!(status, StatusCode::OK);
  let queries: Vec<&str> = body["recent_queries"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["query"].as_str().unwrap())
    .collect();
  assert_eq!(queries, ["four", "three", "two"]);
  assert!(body["recent_queries"].as_array().unwrap().iter().all(|s| s["kind"] == "query"));
}

#[tokio::test]
async fn favicon_round_trip() {
  let app = app().await;
  let (status, meta) = send(&app, put_icon("https://a.example/", 16, b"\x89PNG")).await;
  assert_eq!(status, StatusCode::CREATED);
  let hash = meta["hash"].as_str().unwrap().to_owned();

  let (_, site) = send(&app, get("/sites")).await;
  assert_eq!(site[0]["icon_reference"], hash.as_str());

  let resp = app.clone().oneshot(get(&format!("/favicons/{hash}"))).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  assert_eq!(&bytes[..], b"\x89PNG");

  let (status, _) = send(&app, get("/favicons/0000")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_favicon_is_bad_request() {
  let app = app().await;
  let (status, _) = send(&app, put_icon("https://a.example/", 16, b"")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_sign_in_and_out() {
  let app = app().await;
  let (_, snapshot) = send(&app, get("/session")).await;
  assert_eq!(snapshot, json!({ "state": "signed_out" }));

  let (status, snapshot) = send(
    &app,
    with_json("PUT", "/session", json!({ "user_id": "u1", "display_name": "Ada" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(snapshot["state"], "signed_in");
  assert_eq!(snapshot["user"]["display_name"], "Ada");

  let (status, _) = send(&app, without_body("DELETE", "/session")).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (_, snapshot) = send(&app, get("/session")).await;
  assert_eq!(snapshot["state"], "signed_out");
}

// ─── Live views ──────────────────────────────────────────────────────────────

async fn next_event(body: &mut axum::body::BodyDataStream) -> String {
  let chunk = tokio::time::timeout(std::time::Duration::from_secs(2), body.next())
    .await
    .expect("no event within 2s")
    .unwrap()
    .unwrap();
  String::from_utf8(chunk.to_vec()).unwrap()
}

#[tokio::test]
async fn live_sites_stream_follows_writes() {
  let app = app().await;
  let resp = app.clone().oneshot(get("/live/sites")).await.unwrap();
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");

  let mut body = resp.into_body().into_data_stream();
  let first = next_event(&mut body).await;
  assert!(first.starts_with("event: sites\n"), "{first:?}");
  assert!(first.contains("data: []"), "{first:?}");

  visit(&app, "https://a.example/", "1970-01-01T00:00:01Z").await;
  let second = next_event(&mut body).await;
  assert!(second.contains("https://a.example/"), "{second:?}");
}

#[tokio::test]
async fn live_views_validate_params() {
  let app = app().await;
  let (status, _) = send(&app, get("/live/suggestions?q=")).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(
    &app,
    get("/live/history?from=1970-01-02T00:00:00Z&to=1970-01-01T00:00:00Z"),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[test]
fn store_input_errors_are_bad_requests() {
  use axum::response::IntoResponse as _;

  let invalid = waymark_store_sqlite::Error::from(waymark_core::Error::InvalidInput(
    "empty url".to_owned(),
  ));
  assert_eq!(
    ApiError::store(invalid).into_response().status(),
    StatusCode::BAD_REQUEST
  );

  let conflict = waymark_store_sqlite::Error::Conflict("https://a.example/".to_owned());
  assert_eq!(
    ApiError::store(conflict).into_response().status(),
    StatusCode::INTERNAL_SERVER_ERROR
  );
}
