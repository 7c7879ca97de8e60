//! Domain types: column labels, margin observations, instrument keys.

use chrono::{DateTime, Utc};
use std::fmt;

/// Column labels exactly as they appear in the exchange feed and the history file.
pub mod columns {
    pub const TIME: &str = "Time";
    pub const EXCHANGE: &str = "Exchange";
    pub const ASSET_CLASS: &str = "Asset Class";
    pub const PRODUCT_NAME: &str = "Product Name";
    pub const PRODUCT_CODE: &str = "Product Code";
    pub const START_PERIOD: &str = "Start Period";
    pub const END_PERIOD: &str = "End Period";
    pub const MAINTENANCE: &str = "Maintenance";
    pub const CURRENCY: &str = "Currency";
    pub const MAINT_VOL_SCAN: &str = "Maint. Vol. Scan";

    /// Required columns in canonical file order.
    pub const REQUIRED: [&str; 10] = [
        TIME,
        EXCHANGE,
        ASSET_CLASS,
        PRODUCT_NAME,
        PRODUCT_CODE,
        START_PERIOD,
        END_PERIOD,
        MAINTENANCE,
        CURRENCY,
        MAINT_VOL_SCAN,
    ];

    pub fn is_required(name: &str) -> bool {
        REQUIRED.contains(&name)
    }
}

/// One margin requirement observed at a point in time.
///
/// `extra` holds the cells of any non-required columns, aligned with the
/// owning table's `extra_columns()`.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginObservation {
    pub time: DateTime<Utc>,
    pub exchange: String,
    pub asset_class: String,
    pub product_name: String,
    pub product_code: String,
    pub start_period: String,
    pub end_period: String,
    pub maintenance: f64,
    pub currency: String,
    /// Literal text of `Maint. Vol. Scan`; never interpreted.
    pub maint_vol_scan: String,
    pub extra: Vec<String>,
}

impl MarginObservation {
    /// Series identity of this row. Product name is not part of it.
    pub fn key(&self) -> InstrumentKey {
        InstrumentKey::new(self)
    }

    /// Value of a required column rendered as it is written to disk.
    pub fn required_cell(&self, column: &str) -> Option<String> {
        let cell = match column {
            columns::TIME => format_time(&self.time),
            columns::EXCHANGE => self.exchange.clone(),
            columns::ASSET_CLASS => self.asset_class.clone(),
            columns::PRODUCT_NAME => self.product_name.clone(),
            columns::PRODUCT_CODE => self.product_code.clone(),
            columns::START_PERIOD => self.start_period.clone(),
            columns::END_PERIOD => self.end_period.clone(),
            columns::MAINTENANCE => self.maintenance.to_string(),
            columns::CURRENCY => self.currency.clone(),
            columns::MAINT_VOL_SCAN => self.maint_vol_scan.clone(),
            _ => return None,
        };
        Some(cell)
    }
}

/// Composite identifier of one margin time series:
/// exchange + asset class + product code + start period + end period + currency.
///
/// Derived on demand; it is never stored as a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentKey(String);

impl InstrumentKey {
    pub fn new(obs: &MarginObservation) -> Self {
        let mut key = String::with_capacity(
            obs.exchange.len()
                + obs.asset_class.len()
                + obs.product_code.len()
                + obs.start_period.len()
                + obs.end_period.len()
                + obs.currency.len(),
        );
        key.push_str(&obs.exchange);
        key.push_str(&obs.asset_class);
        key.push_str(&obs.product_code);
        key.push_str(&obs.start_period);
        key.push_str(&obs.end_period);
        key.push_str(&obs.currency);
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-disk timestamp format: UTC, second precision, trailing `Z`.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}
