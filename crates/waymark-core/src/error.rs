//! Error types for `waymark-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("invalid url {url:?}: {source}")]
  InvalidUrl {
    url:    String,
    #[source]
    source: url::ParseError,
  },

  #[error("unknown visit type: {0:?}")]
  UnknownVisitType(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
