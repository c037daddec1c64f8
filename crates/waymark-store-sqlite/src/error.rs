//! Error type for `waymark-store-sqlite`.

use thiserror::Error;
use waymark_core::store::StoreError;

#[derive(Debug, Error)]
pub enum Error {
  /// Rejected before anything was written (malformed URL, empty icon, ...).
  #[error("core error: {0}")]
  Core(#[from] waymark_core::Error),

  /// The database could not be reached or the statement failed.
  #[error("storage unavailable: {0}")]
  StorageUnavailable(#[from] tokio_rusqlite::Error),

  /// The on-disk schema is newer than this build understands.
  #[error("database schema version {found} is newer than supported version {supported}")]
  UnsupportedSchema { found: i64, supported: i64 },

  #[error("migration to schema version {version} failed: {source}")]
  Migration {
    version: i64,
    #[source]
    source:  tokio_rusqlite::Error,
  },

  /// Concurrent writers kept winning the insert for this URL.
  #[error("gave up merging {0:?} after repeated write conflicts")]
  Conflict(String),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("timestamp out of range: {0}")]
  Timestamp(i64),
}

impl StoreError for Error {
  fn is_invalid_input(&self) -> bool {
    matches!(
      self,
      Self::Core(
        waymark_core::Error::InvalidInput(_) | waymark_core::Error::InvalidUrl { .. }
      )
    )
  }
}

impl Error {
  /// Whether the failure is a schema problem the application must handle at
  /// open time (e.g. by recreating the database).
  pub fn is_migration(&self) -> bool {
    matches!(self, Self::UnsupportedSchema { .. } | Self::Migration { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
