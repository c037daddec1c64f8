//! Favicons delivered by the icon-fetch callback.
//!
//! Icons are content-addressed: the SHA-256 of the raw bytes is both the
//! primary key in storage and the `icon_reference` carried by sites and
//! domains.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Upper bound on a single icon payload.
pub const MAX_ICON_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favicon {
  /// Lower-case hex SHA-256 of `data`.
  pub hash:       String,
  pub media_type: String,
  pub width:      u32,
  pub height:     u32,
  #[serde(skip)]
  pub data:       Vec<u8>,
}

impl Favicon {
  /// Build a favicon from raw image bytes, computing its content hash.
  pub fn from_bytes(
    media_type: impl Into<String>,
    width: u32,
    height: u32,
    data: Vec<u8>,
  ) -> Result<Self> {
    if data.is_empty() {
      return Err(Error::InvalidInput("favicon is empty".to_owned()));
    }
    if data.len() > MAX_ICON_BYTES {
      return Err(Error::InvalidInput(format!(
        "favicon is {} bytes, limit is {MAX_ICON_BYTES}",
        data.len()
      )));
    }
    Ok(Self {
      hash: content_hash(&data),
      media_type: media_type.into(),
      width,
      height,
      data,
    })
  }
}

pub fn content_hash(data: &[u8]) -> String { hex::encode(Sha256::digest(data)) }

/// Whether a candidate icon of `candidate_width` should replace the current
/// icon. `current_width` is `None` when there is no current icon.
///
/// Larger wins; ties keep the current icon.
pub fn is_better_icon(current_width: Option<u32>, candidate_width: u32) -> bool {
  match current_width {
    None => true,
    Some(current) => candidate_width > current,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_is_sha256_hex() {
    let icon = Favicon::from_bytes("image/png", 16, 16, b"abc".to_vec()).unwrap();
    assert_eq!(
      icon.hash,
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn empty_icon_rejected() {
    assert!(Favicon::from_bytes("image/png", 16, 16, Vec::new()).is_err());
  }

  #[test]
  fn larger_wins_ties_keep_current() {
    assert!(is_better_icon(None, 0));
    assert!(is_better_icon(Some(16), 32));
    assert!(!is_better_icon(Some(32), 32));
    assert!(!is_better_icon(Some(64), 32));
  }
}
