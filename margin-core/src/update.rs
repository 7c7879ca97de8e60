//! Update orchestrator: fetch → read existing history → merge → write.

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::feed::{FetchError, MarginFeed};
use crate::merge::merge;
use crate::schema::SchemaError;
use crate::store::{self, StoreError};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("merge failed: {0}")]
    Schema(#[from] SchemaError),
}

/// What an update run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub fetched: usize,
    /// Rows in the history file before the update; `None` if it did not exist.
    pub existing: Option<usize>,
    pub written: usize,
}

impl UpdateSummary {
    /// Rows appended to the history by this run.
    pub fn appended(&self) -> usize {
        self.written.saturating_sub(self.existing.unwrap_or(0))
    }
}

/// Fetch a snapshot from `feed` and merge it into the history file at `path`.
///
/// A missing file means no history: the snapshot is written as-is. Nothing is
/// written unless fetch, read and merge all succeed.
pub fn update_margin_file(feed: &dyn MarginFeed, path: &Path) -> Result<UpdateSummary, UpdateError> {
    let incoming = feed.fetch()?;
    incoming.validate()?;
    let fetched = incoming.len();

    let (result, existing) = match store::read_if_exists(path)? {
        Some(existing) => {
            let rows = existing.len();
            (merge(&existing, &incoming)?, Some(rows))
        }
        None => (incoming, None),
    };

    store::write(&result, path)?;

    let summary = UpdateSummary {
        fetched,
        existing,
        written: result.len(),
    };
    info!(
        feed = feed.name(),
        path = %path.display(),
        fetched = summary.fetched,
        appended = summary.appended(),
        written = summary.written,
        "margin history updated"
    );
    Ok(summary)
}
