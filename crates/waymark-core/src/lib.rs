//! Domain types for the Waymark history store: sites, visits, favicons,
//! suggestions, the session context and the [`store::HistoryStore`] trait
//! that storage backends implement.

#![allow(async_fn_in_trait)]

pub mod domain;
pub mod error;
pub mod favicon;
pub mod history;
pub mod normalize;
pub mod session;
pub mod site;
pub mod store;
pub mod suggestion;

pub use error::{Error, Result};
pub use normalize::normalize_url;
