//! Merge an existing margin history with a freshly fetched snapshot.

use tracing::debug;

use crate::compact::compact;
use crate::schema::SchemaError;
use crate::table::MarginTable;

/// Append `incoming` to `existing` and compact the result.
///
/// Both inputs are validated before anything is concatenated, so a schema
/// failure never yields a partial merge. The output is validated as well.
pub fn merge(existing: &MarginTable, incoming: &MarginTable) -> Result<MarginTable, SchemaError> {
    existing.validate()?;
    incoming.validate()?;

    let combined = existing.concat(incoming);
    let merged = compact(&combined);
    merged.validate()?;

    debug!(
        existing = existing.len(),
        incoming = incoming.len(),
        kept = merged.len(),
        dropped = combined.len() - merged.len(),
        "merged margin tables"
    );

    Ok(merged)
}
