//! Margin snapshot sources

pub mod cme;
pub mod provider;

pub use cme::CmeMarginFeed;
pub use provider::{parse_snapshot, FetchError, MarginFeed};
