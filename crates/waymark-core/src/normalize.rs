//! URL normalisation: the key under which site records are unique.

use url::Url;

use crate::{Error, Result};

/// Normalise `raw` into the canonical form stored in the `sites.url` column.
///
/// The input is trimmed and parsed as an absolute URL. Scheme and host are
/// lower-cased, default ports dropped and an empty path becomes `/`, so
/// `HTTPS://Example.COM:443` and `https://example.com/` map to the same
/// record. URLs without a host (`mailto:`, `data:`) are rejected.
pub fn normalize_url(raw: &str) -> Result<String> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return Err(Error::InvalidInput("url is empty".to_owned()));
  }

  let parsed = Url::parse(trimmed).map_err(|source| Error::InvalidUrl {
    url: trimmed.to_owned(),
    source,
  })?;

  if parsed.cannot_be_a_base() || parsed.host_str().is_none_or(str::is_empty) {
    return Err(Error::InvalidInput(format!("url has no host: {trimmed:?}")));
  }

  Ok(parsed.into())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lowercases_scheme_and_host() {
    assert_eq!(
      normalize_url("HTTPS://WWW.Example.COM/Path?q=A").unwrap(),
      "https://www.example.com/Path?q=A"
    );
  }

  #[test]
  fn adds_root_path_and_drops_default_port() {
    assert_eq!(
      normalize_url("  https://www.a.com:443 ").unwrap(),
      "https://www.a.com/"
    );
  }

  #[test]
  fn rejects_empty() {
    assert!(matches!(normalize_url("   "), Err(Error::InvalidInput(_))));
  }

  #[test]
  fn rejects_relative() {
    assert!(matches!(
      normalize_url("/just/a/path"),
      Err(Error::InvalidUrl { .. })
    ));
  }

  #[test]
  fn rejects_hostless() {
    assert!(matches!(
      normalize_url("mailto:someone@example.com"),
      Err(Error::InvalidInput(_))
    ));
  }
}
