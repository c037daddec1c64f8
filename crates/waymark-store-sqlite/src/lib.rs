//! SQLite backend for the Waymark history store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Writers publish a change notification
//! after each commit; [`SiteSubscription`] re-runs its query on every change.

mod encode;
mod live;
mod merge;
mod purge;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use live::SiteSubscription;
pub use store::SqliteStore;
