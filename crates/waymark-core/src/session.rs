//! The signed-in user, passed explicitly to whoever needs it.
//!
//! Readers hold an immutable [`UserSnapshot`]; sign-in and sign-out replace
//! the snapshot atomically and wake every subscriber.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
  pub user_id:      String,
  pub display_name: Option<String>,
  pub email:        Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "user", rename_all = "snake_case")]
pub enum UserSnapshot {
  #[default]
  SignedOut,
  SignedIn(Arc<UserInfo>),
}

impl UserSnapshot {
  pub fn user(&self) -> Option<&UserInfo> {
    match self {
      Self::SignedOut => None,
      Self::SignedIn(user) => Some(user),
    }
  }
}

/// Owner of the current session. Cloning shares the same session.
#[derive(Debug, Clone)]
pub struct SessionContext {
  tx: Arc<watch::Sender<UserSnapshot>>,
}

impl Default for SessionContext {
  fn default() -> Self { Self::new(UserSnapshot::SignedOut) }
}

impl SessionContext {
  pub fn new(initial: UserSnapshot) -> Self {
    let (tx, _rx) = watch::channel(initial);
    Self { tx: Arc::new(tx) }
  }

  pub fn current(&self) -> UserSnapshot { self.tx.borrow().clone() }

  pub fn sign_in(&self, user: UserInfo) {
    self.tx.send_replace(UserSnapshot::SignedIn(Arc::new(user)));
  }

  pub fn sign_out(&self) { self.tx.send_replace(UserSnapshot::SignedOut); }

  /// A receiver that observes every subsequent sign-in and sign-out.
  pub fn subscribe(&self) -> watch::Receiver<UserSnapshot> { self.tx.subscribe() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn alice() -> UserInfo {
    UserInfo {
      user_id:      "alice".into(),
      display_name: Some("Alice".into()),
      email:        None,
    }
  }

  #[test]
  fn starts_signed_out() {
    let session = SessionContext::default();
    assert_eq!(session.current(), UserSnapshot::SignedOut);
    assert!(session.current().user().is_none());
  }

  #[test]
  fn snapshots_are_immutable() {
    let session = SessionContext::default();
    session.sign_in(alice());
    let before = session.current();
    session.sign_out();

    assert_eq!(before.user().map(|u| u.user_id.as_str()), Some("alice"));
    assert_eq!(session.current(), UserSnapshot::SignedOut);
  }

  #[tokio::test]
  async fn subscribers_see_updates() {
    let session = SessionContext::default();
    let mut rx = session.subscribe();

    let clone = session.clone();
    clone.sign_in(alice());

    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().user().unwrap().user_id, "alice");
  }
}
