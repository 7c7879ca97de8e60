//! Ordered margin table and conversion from/to raw CSV records.
//!
//! A table carries its column list alongside the typed rows so that columns
//! beyond the required ten survive a read → merge → write cycle untouched.
//! Row order is file order and is never re-sorted here.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::{columns, MarginObservation};
use crate::schema::{MarginSchema, SchemaError};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarginTable {
    columns: Vec<String>,
    rows: Vec<MarginObservation>,
}

impl MarginTable {
    /// Build a table from a column list and rows whose `extra` cells follow the
    /// non-required columns of `columns`. No schema check happens here; call
    /// [`MarginTable::validate`] at boundaries.
    pub fn new(columns: Vec<String>, rows: Vec<MarginObservation>) -> Self {
        Self { columns, rows }
    }

    /// Empty table with exactly the required columns.
    pub fn empty() -> Self {
        Self::with_required_columns(Vec::new())
    }

    pub fn with_required_columns(rows: Vec<MarginObservation>) -> Self {
        Self::new(
            MarginSchema::required().iter().map(|c| c.to_string()).collect(),
            rows,
        )
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        MarginSchema::validate(&self.columns)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Non-required columns in table order.
    pub fn extra_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !columns::is_required(c))
    }

    pub fn rows(&self) -> &[MarginObservation] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<MarginObservation> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Same columns, rows replaced.
    pub fn with_rows(&self, rows: Vec<MarginObservation>) -> Self {
        Self::new(self.columns.clone(), rows)
    }

    /// Parse raw string records under `header`.
    ///
    /// The header is checked first, so a table missing a required column fails
    /// with `MissingColumns` before any record is looked at. `row` in
    /// `InvalidValue` is the zero-based data row index.
    pub fn from_records<I>(header: Vec<String>, records: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        MarginSchema::validate(&header)?;

        let position = |name: &str| header.iter().position(|c| c == name);
        // Present after a successful validate.
        let idx: Vec<usize> = columns::REQUIRED
            .iter()
            .map(|&name| position(name).unwrap_or_default())
            .collect();
        let extra_idx: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, c)| !columns::is_required(c))
            .map(|(i, _)| i)
            .collect();

        let mut rows = Vec::new();
        for (row, record) in records.into_iter().enumerate() {
            if record.len() != header.len() {
                return Err(SchemaError::InvalidValue {
                    column: "*".into(),
                    row,
                    reason: format!(
                        "expected {} fields, found {}",
                        header.len(),
                        record.len()
                    ),
                });
            }
            let cell = |i: usize| record[idx[i]].clone();

            let time_text = &record[idx[0]];
            let time = parse_time(time_text).ok_or_else(|| SchemaError::InvalidValue {
                column: columns::TIME.into(),
                row,
                reason: format!("unrecognised timestamp {time_text:?}"),
            })?;
            let maintenance = parse_maintenance(&record[idx[7]]).map_err(|reason| {
                SchemaError::InvalidValue {
                    column: columns::MAINTENANCE.into(),
                    row,
                    reason,
                }
            })?;

            rows.push(MarginObservation {
                time,
                exchange: cell(1),
                asset_class: cell(2),
                product_name: cell(3),
                product_code: cell(4),
                start_period: cell(5),
                end_period: cell(6),
                maintenance,
                currency: cell(8),
                maint_vol_scan: cell(9),
                extra: extra_idx.iter().map(|&i| record[i].clone()).collect(),
            });
        }

        Ok(Self::new(header, rows))
    }

    /// Render each row as string cells in column order.
    pub fn to_records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(move |obs| {
            let mut extra = obs.extra.iter();
            self.columns
                .iter()
                .map(|c| match obs.required_cell(c) {
                    Some(cell) => cell,
                    None => extra.next().cloned().unwrap_or_default(),
                })
                .collect()
        })
    }

    /// `self` rows followed by `other` rows.
    ///
    /// Columns are `self`'s columns followed by any column only `other` has;
    /// extra cells a side lacks are left empty.
    pub fn concat(&self, other: &MarginTable) -> MarginTable {
        let mut merged = self.columns.clone();
        for c in &other.columns {
            if !merged.contains(c) {
                merged.push(c.clone());
            }
        }

        let target: Vec<&str> = merged
            .iter()
            .map(String::as_str)
            .filter(|c| !columns::is_required(c))
            .collect();

        let mut rows = Vec::with_capacity(self.len() + other.len());
        for table in [self, other] {
            let source: Vec<&str> = table.extra_columns().collect();
            let realign = source.as_slice() != target.as_slice();
            for obs in &table.rows {
                let mut obs = obs.clone();
                if realign {
                    obs.extra = target
                        .iter()
                        .map(|name| {
                            source
                                .iter()
                                .position(|s| s == name)
                                .and_then(|i| obs.extra.get(i).cloned())
                                .unwrap_or_default()
                        })
                        .collect();
                }
                rows.push(obs);
            }
        }

        MarginTable::new(merged, rows)
    }
}

/// Parse a `Time` cell.
///
/// Accepts the on-disk `%Y-%m-%dT%H:%M:%SZ`, any RFC 3339 timestamp, and
/// `YYYY-MM-DD HH:MM:SS[.f][+HH:MM]`. Naive timestamps are taken as UTC.
pub fn parse_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn parse_maintenance(text: &str) -> Result<f64, String> {
    let value: f64 = text
        .trim()
        .parse()
        .map_err(|_| format!("not a number: {text:?}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("not a finite number: {text:?}"))
    }
}
