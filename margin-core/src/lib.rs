//! Margin Core: CME margin history maintenance.
//!
//! This crate contains:
//! - Domain types (margin observations, instrument keys, column labels)
//! - Schema validation for margin tables
//! - Change-point compaction and the history/snapshot merge
//! - CSV store with atomic writes
//! - Feed fetcher for the CME outright margin CSV
//! - Updater configuration and the end-to-end update flow

pub mod compact;
pub mod config;
pub mod domain;
pub mod feed;
pub mod merge;
pub mod schema;
pub mod store;
pub mod table;
pub mod update;

pub use compact::compact;
pub use config::{ConfigError, FeedConfig, UpdaterConfig};
pub use domain::{InstrumentKey, MarginObservation};
pub use feed::{CmeMarginFeed, FetchError, MarginFeed};
pub use merge::merge;
pub use schema::{MarginSchema, SchemaError};
pub use store::StoreError;
pub use table::MarginTable;
pub use update::{update_margin_file, UpdateError, UpdateSummary};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the feed and table types can cross threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<MarginTable>();
        require_sync::<MarginTable>();
        require_send::<CmeMarginFeed>();
        require_sync::<CmeMarginFeed>();
        require_send::<UpdaterConfig>();
        require_sync::<UpdaterConfig>();
    }

    /// The feed trait stays object safe so the CLI and tests can swap sources.
    #[test]
    fn margin_feed_is_object_safe() {
        fn _takes_dyn(feed: &dyn MarginFeed) -> Result<MarginTable, FetchError> {
            feed.fetch()
        }
    }
}
