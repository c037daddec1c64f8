//! Suggestions presented to the URL bar, projected from stored records.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
  domain::DomainResolver,
  site::{DomainRecord, SiteRecord},
};

/// Identifies search-results URLs so that visited searches can be offered as
/// query suggestions instead of navigations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProvider {
  /// URL prefix of the results page, e.g. `https://duckduckgo.com/`.
  pub results_url: String,
  /// Query-string parameter that carries the search text.
  pub query_param: String,
}

impl Default for SearchProvider {
  fn default() -> Self {
    Self {
      results_url: "https://duckduckgo.com/".to_owned(),
      query_param: "q".to_owned(),
    }
  }
}

impl SearchProvider {
  /// The search text of `url` if it is a results page of this provider.
  pub fn query_of(&self, url: &str) -> Option<String> {
    if !url.starts_with(&self.results_url) {
      return None;
    }
    Url::parse(url)
      .ok()?
      .query_pairs()
      .find(|(k, _)| k == self.query_param.as_str())
      .map(|(_, v)| v.into_owned())
      .filter(|q| !q.is_empty())
  }
}

/// A site the user can navigate to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavSuggestion {
  pub url:             String,
  pub label:           String,
  pub secondary_label: String,
  pub icon_reference:  Option<String>,
}

/// A past search the user can re-run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySuggestion {
  pub url:   String,
  pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Suggestion {
  Navigation(NavSuggestion),
  Query(QuerySuggestion),
}

impl Suggestion {
  /// Project a site into a suggestion. Search-results pages become
  /// [`Suggestion::Query`]; everything else is a navigation labelled with the
  /// best available name.
  pub fn from_site(
    site: &SiteRecord,
    resolver: &dyn DomainResolver,
    search: &SearchProvider,
  ) -> Self {
    if let Some(query) = search.query_of(&site.url) {
      return Self::Query(QuerySuggestion { url: site.url.clone(), query });
    }

    let domain = resolver.registered_domain(&site.url);
    let secondary_label = domain.clone().unwrap_or_else(|| site.url.clone());
    let label = site
      .title
      .clone()
      .or(domain)
      .unwrap_or_else(|| site.url.clone());

    Self::Navigation(NavSuggestion {
      url: site.url.clone(),
      label,
      secondary_label,
      icon_reference: site.icon_reference.clone(),
    })
  }

  /// Project a registered domain into a navigation to its `www` homepage.
  pub fn from_domain(domain: &DomainRecord) -> Self {
    Self::Navigation(NavSuggestion {
      url:             format!("https://www.{}/", domain.domain),
      label:           domain
        .provider_name
        .clone()
        .unwrap_or_else(|| domain.domain.clone()),
      secondary_label: domain.domain.clone(),
      icon_reference:  domain.icon_reference.clone(),
    })
  }

  pub fn url(&self) -> &str {
    match self {
      Self::Navigation(nav) => &nav.url,
      Self::Query(query) => &query.url,
    }
  }

  pub fn label(&self) -> &str {
    match self {
      Self::Navigation(nav) => &nav.label,
      Self::Query(query) => &query.query,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::domain::SuffixListResolver;

  fn site(url: &str, title: Option<&str>) -> SiteRecord {
    SiteRecord {
      site_id:              Uuid::new_v4(),
      url:                  url.to_owned(),
      visit_count:          1,
      last_visit_timestamp: Utc::now(),
      title:                title.map(str::to_owned),
      icon_reference:       None,
    }
  }

  #[test]
  fn titled_site_uses_title_and_domain() {
    let s = Suggestion::from_site(
      &site("https://news.example.com/story", Some("Story")),
      &SuffixListResolver::default(),
      &SearchProvider::default(),
    );
    assert_eq!(
      s,
      Suggestion::Navigation(NavSuggestion {
        url:             "https://news.example.com/story".into(),
        label:           "Story".into(),
        secondary_label: "example.com".into(),
        icon_reference:  None,
      })
    );
  }

  #[test]
  fn untitled_site_falls_back_to_domain_then_url() {
    let resolver = SuffixListResolver::default();
    let search = SearchProvider::default();

    let s = Suggestion::from_site(&site("https://www.example.com/", None), &resolver, &search);
    assert_eq!(s.label(), "example.com");

    let s = Suggestion::from_site(&site("http://127.0.0.1:8080/", None), &resolver, &search);
    assert_eq!(s.label(), "http://127.0.0.1:8080/");
  }

  #[test]
  fn search_results_become_query_suggestions() {
    let s = Suggestion::from_site(
      &site("https://duckduckgo.com/?q=rust+traits&ia=web", Some("rust traits at DuckDuckGo")),
      &SuffixListResolver::default(),
      &SearchProvider::default(),
    );
    assert!(matches!(&s, Suggestion::Query(q) if q.query == "rust traits"));
    assert_eq!(s.label(), "rust traits");
  }

  #[test]
  fn domain_projection() {
    let d = DomainRecord {
      domain_id:      Uuid::new_v4(),
      domain:         "example.org".into(),
      provider_name:  None,
      icon_reference: Some("abc".into()),
    };
    let s = Suggestion::from_domain(&d);
    assert_eq!(s.url(), "https://www.example.org/");
    assert_eq!(s.label(), "example.org");
  }
}
