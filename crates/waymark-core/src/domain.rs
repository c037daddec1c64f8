//! Registered-domain resolution.
//!
//! Maps a host such as `news.example.co.uk` to its registrable domain
//! (`example.co.uk`). Resolution is a pure function supplied by the host
//! application; [`SuffixListResolver`] is a small built-in implementation
//! following public-suffix-list semantics for a fixed rule set.

use std::{collections::HashSet, net::IpAddr};

use url::Url;

/// A pure mapping from hosts to registered domains.
pub trait DomainResolver: Send + Sync {
  /// The registered domain for `host`, or `None` if the host is itself a
  /// public suffix, an IP address, or malformed.
  fn registered_domain_for_host(&self, host: &str) -> Option<String>;

  /// The registered domain of the host of `url`.
  fn registered_domain(&self, url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    self.registered_domain_for_host(parsed.host_str()?)
  }
}

/// Multi-label public suffixes known to the built-in resolver. Every single
/// label TLD is implicitly a suffix.
const BUILTIN_SUFFIXES: &[&str] = &[
  "ac.jp", "ac.uk", "co.in", "co.jp", "co.kr", "co.nz", "co.uk", "co.za",
  "com.au", "com.br", "com.cn", "com.mx", "com.tr", "com.tw", "gov.uk",
  "ltd.uk", "ne.jp", "net.au", "net.br", "or.jp", "org.au", "org.br",
  "org.uk", "plc.uk", "uk.com", "github.io", "gitlab.io", "herokuapp.com",
  "blogspot.com", "appspot.com",
];

/// Resolver backed by an in-memory suffix set.
#[derive(Debug, Clone)]
pub struct SuffixListResolver {
  suffixes: HashSet<String>,
}

impl Default for SuffixListResolver {
  fn default() -> Self { Self::from_rules(BUILTIN_SUFFIXES.iter().copied()) }
}

impl SuffixListResolver {
  /// Build a resolver from suffix rules such as `"co.uk"`.
  pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a str>) -> Self {
    let suffixes = rules
      .into_iter()
      .map(|r| r.trim().trim_start_matches('.').to_ascii_lowercase())
      .filter(|r| !r.is_empty())
      .collect();
    Self { suffixes }
  }
}

impl DomainResolver for SuffixListResolver {
  fn registered_domain_for_host(&self, host: &str) -> Option<String> {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() || host.starts_with('.') || host.contains("..") {
      return None;
    }
    if host.trim_matches(['[', ']']).parse::<IpAddr>().is_ok() {
      return None;
    }

    let labels: Vec<&str> = host.split('.').collect();
    // Longest listed suffix that leaves at least one label in front of it;
    // otherwise the default rule makes the last label the suffix.
    let suffix_len = (1..labels.len())
      .rev()
      .find(|&n| self.suffixes.contains(&labels[labels.len() - n..].join(".")))
      .unwrap_or(1);

    if self.suffixes.contains(&host) || labels.len() <= suffix_len {
      return None;
    }
    Some(labels[labels.len() - suffix_len - 1..].join("."))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn domain(host: &str) -> Option<String> {
    SuffixListResolver::default().registered_domain_for_host(host)
  }

  #[test]
  fn simple_tld() {
    assert_eq!(domain("example.com").as_deref(), Some("example.com"));
    assert_eq!(domain("a.b.example.com").as_deref(), Some("example.com"));
    assert_eq!(domain("com"), None);
  }

  #[test]
  fn mixed_case() {
    assert_eq!(domain("WwW.example.COM").as_deref(), Some("example.com"));
  }

  #[test]
  fn leading_dot_rejected() {
    assert_eq!(domain(".example.com"), None);
    assert_eq!(domain(".com"), None);
  }

  #[test]
  fn unlisted_tld_uses_default_rule() {
    assert_eq!(domain("example"), None);
    assert_eq!(domain("example.example").as_deref(), Some("example.example"));
    assert_eq!(domain("b.example.example").as_deref(), Some("example.example"));
  }

  #[test]
  fn two_level_suffixes() {
    assert_eq!(domain("uk.com"), None);
    assert_eq!(domain("example.uk.com").as_deref(), Some("example.uk.com"));
    assert_eq!(domain("a.b.example.uk.com").as_deref(), Some("example.uk.com"));
    assert_eq!(domain("www.test.ac.jp").as_deref(), Some("test.ac.jp"));
  }

  #[test]
  fn ip_addresses_have_no_domain() {
    assert_eq!(domain("127.0.0.1"), None);
    assert_eq!(domain("[::1]"), None);
  }

  #[test]
  fn resolves_from_url() {
    let resolver = SuffixListResolver::default();
    assert_eq!(
      resolver.registered_domain("https://news.bbc.co.uk/world").as_deref(),
      Some("bbc.co.uk")
    );
  }
}
