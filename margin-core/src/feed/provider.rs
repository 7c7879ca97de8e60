//! Margin feed trait, structured fetch errors, and snapshot parsing.
//!
//! The MarginFeed trait abstracts over where a snapshot comes from (the CME
//! website, a file, a test double) so the update flow can be exercised offline.

use chrono::{DateTime, SubsecRound, Utc};
use thiserror::Error;
use tracing::warn;

use crate::domain::{columns, format_time};
use crate::schema::SchemaError;
use crate::table::MarginTable;

/// Structured error types for feed operations.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by exchange (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("feed schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkUnreachable(_) | FetchError::RateLimited { .. } => true,
            FetchError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Source of margin snapshots.
pub trait MarginFeed: Send + Sync {
    /// Human-readable name of this feed.
    fn name(&self) -> &str;

    /// Fetch one snapshot, stamped with its capture time and validated.
    fn fetch(&self) -> Result<MarginTable, FetchError>;
}

/// Parse raw feed CSV into a margin table.
///
/// Rows with an empty `Maintenance` are dropped, then a `Time` column holding
/// `captured_at` (whole seconds) is prepended to every row.
pub fn parse_snapshot(text: &str, captured_at: DateTime<Utc>) -> Result<MarginTable, FetchError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let feed_header: Vec<String> = reader
        .headers()
        .map_err(|e| FetchError::ResponseFormat(format!("unreadable header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if feed_header.iter().any(|h| h == columns::TIME) {
        return Err(FetchError::ResponseFormat(
            "feed already carries a Time column".into(),
        ));
    }
    let maintenance_idx = feed_header
        .iter()
        .position(|h| h == columns::MAINTENANCE)
        .ok_or_else(|| SchemaError::MissingColumns(vec![columns::MAINTENANCE.to_string()]))?;

    let stamp = format_time(&captured_at.trunc_subsecs(0));
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| FetchError::ResponseFormat(format!("bad record {line}: {e}")))?;
        let has_maintenance = record
            .get(maintenance_idx)
            .is_some_and(|m| !m.trim().is_empty());
        if !has_maintenance {
            dropped += 1;
            continue;
        }
        let mut cells = Vec::with_capacity(record.len() + 1);
        cells.push(stamp.clone());
        cells.extend(record.iter().map(str::to_string));
        records.push(cells);
    }

    if dropped > 0 {
        warn!(dropped, "dropped feed rows without a maintenance value");
    }

    let mut header = Vec::with_capacity(feed_header.len() + 1);
    header.push(columns::TIME.to_string());
    header.extend(feed_header);

    let table = MarginTable::from_records(header, records)?;
    table.validate()?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED_HEADER: &str = "Exchange,Asset Class,Product Name,Product Code,\
                               Start Period,End Period,Maintenance,Currency,Maint. Vol. Scan";

    fn captured() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 21, 5, 9).unwrap() + chrono::Duration::milliseconds(750)
    }

    #[test]
    fn stamps_every_row_with_one_capture_time() {
        let text = format!(
            "{FEED_HEADER}\n\
             CME,Equity,E-mini S&P 500,ES,03/2024,06/2024,12100,USD,\n\
             CME,Equity,E-mini Nasdaq,NQ,03/2024,06/2024,17500,USD,\n"
        );
        let table = parse_snapshot(&text, captured()).unwrap();

        assert_eq!(table.columns()[0], "Time");
        assert_eq!(table.len(), 2);
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 21, 5, 9).unwrap();
        assert!(table.rows().iter().all(|r| r.time == expected));
    }

    #[test]
    fn drops_rows_with_empty_maintenance() {
        let text = format!(
            "{FEED_HEADER}\n\
             CME,Equity,E-mini S&P 500,ES,03/2024,06/2024,12100,USD,\n\
             CME,Equity,Micro E-mini,MES,03/2024,06/2024,,USD,\n\
             CME,Equity,E-mini Nasdaq,NQ,03/2024,06/2024,  ,USD,\n"
        );
        let table = parse_snapshot(&text, captured()).unwrap();
        let codes: Vec<&str> = table.rows().iter().map(|r| r.product_code.as_str()).collect();
        assert_eq!(codes, vec!["ES"]);
    }

    #[test]
    fn strips_byte_order_mark() {
        let text = format!(
            "\u{feff}{FEED_HEADER}\nCME,Equity,E-mini S&P 500,ES,03/2024,06/2024,12100,USD,\n"
        );
        let table = parse_snapshot(&text, captured()).unwrap();
        assert_eq!(table.columns()[1], "Exchange");
    }

    #[test]
    fn keeps_extra_feed_columns() {
        let text = "Exchange,Asset Class,Product Name,Product Code,Start Period,End Period,\
                    Initial,Maintenance,Currency,Maint. Vol. Scan\n\
                    CME,Equity,E-mini S&P 500,ES,03/2024,06/2024,13310,12100,USD,\n";
        let table = parse_snapshot(text, captured()).unwrap();
        assert_eq!(table.extra_columns().collect::<Vec<_>>(), vec!["Initial"]);
        assert_eq!(table.rows()[0].extra, vec!["13310".to_string()]);
    }

    #[test]
    fn missing_currency_is_a_schema_error() {
        let text = "Exchange,Asset Class,Product Name,Product Code,Start Period,End Period,\
                    Maintenance,Maint. Vol. Scan\n\
                    CME,Equity,E-mini S&P 500,ES,03/2024,06/2024,12100,\n";
        match parse_snapshot(text, captured()) {
            Err(FetchError::Schema(SchemaError::MissingColumns(cols))) => {
                assert_eq!(cols, vec!["Currency".to_string()]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn missing_maintenance_is_a_schema_error() {
        let text = "Exchange,Currency\nCME,USD\n";
        assert!(matches!(
            parse_snapshot(text, captured()),
            Err(FetchError::Schema(_))
        ));
    }

    #[test]
    fn transient_classification() {
        assert!(FetchError::NetworkUnreachable("x".into()).is_transient());
        assert!(FetchError::HttpStatus { status: 503, url: "u".into() }.is_transient());
        assert!(!FetchError::HttpStatus { status: 404, url: "u".into() }.is_transient());
        assert!(!FetchError::ResponseFormat("x".into()).is_transient());
    }
}
