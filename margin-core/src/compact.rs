//! Change-point compaction of per-instrument margin series.
//!
//! Rows are grouped by [`InstrumentKey`] without reordering. Within a group the
//! first row is always kept, and a later row is kept only when its maintenance
//! differs from the last *kept* row of that group. The output is the input
//! sequence with the dropped rows removed.

use std::collections::HashMap;

use crate::domain::InstrumentKey;
use crate::table::MarginTable;

/// Compact `table`, keeping only change points per instrument.
///
/// The first observation of every key is kept unconditionally, including a
/// genuine maintenance of zero.
pub fn compact(table: &MarginTable) -> MarginTable {
    let keep = change_points(table);
    let rows = table
        .rows()
        .iter()
        .zip(keep)
        .filter_map(|(obs, keep)| keep.then(|| obs.clone()))
        .collect();
    table.with_rows(rows)
}

/// Per-row keep flags, aligned with `table.rows()`.
pub fn change_points(table: &MarginTable) -> Vec<bool> {
    let mut groups: HashMap<InstrumentKey, Vec<usize>> = HashMap::new();
    for (pos, obs) in table.rows().iter().enumerate() {
        groups.entry(obs.key()).or_default().push(pos);
    }

    let rows = table.rows();
    let mut keep = vec![false; rows.len()];
    for positions in groups.values() {
        let mut last_kept: Option<f64> = None;
        for &pos in positions {
            let value = rows[pos].maintenance;
            if last_kept != Some(value) {
                keep[pos] = true;
                last_kept = Some(value);
            }
        }
    }
    keep
}
