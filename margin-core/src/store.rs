//! CSV store for the margin history file.
//!
//! - Header row carries the literal column labels (`Asset Class`, `Maint. Vol. Scan`, ...)
//! - `Time` is written as `%Y-%m-%dT%H:%M:%SZ`
//! - Atomic writes (write to `{file}.tmp`, rename into place)
//! - Schema validated on every read and before every write

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::schema::SchemaError;
use crate::table::MarginTable;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("schema error in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv(path: &Path, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn schema(path: &Path, source: SchemaError) -> Self {
        StoreError::Schema {
            path: path.to_path_buf(),
            source,
        }
    }

    /// The schema violation behind this error, if any.
    pub fn schema_error(&self) -> Option<&SchemaError> {
        match self {
            StoreError::Schema { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Read and validate a margin history file.
pub fn read(path: &Path) -> Result<MarginTable, StoreError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    let table = read_table(&mut reader).map_err(|e| match e {
        ReadError::Csv(e) => StoreError::csv(path, e),
        ReadError::Schema(e) => StoreError::schema(path, e),
    })?;
    info!(path = %path.display(), rows = table.len(), "read margin history");
    Ok(table)
}

/// Like [`read`], but a missing file means "no history" rather than an error.
pub fn read_if_exists(path: &Path) -> Result<Option<MarginTable>, StoreError> {
    match fs::metadata(path) {
        Ok(_) => read(path).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no existing margin history");
            Ok(None)
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Validate and write `table` to `path`.
///
/// The file is replaced in one rename; on failure the previous file is untouched
/// and the temp file is removed.
pub fn write(table: &MarginTable, path: &Path) -> Result<(), StoreError> {
    table.validate().map_err(|e| StoreError::schema(path, e))?;

    let tmp_path = temp_path(path);
    if let Err(e) = write_csv(table, &tmp_path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::io(path, e)
    })?;

    info!(path = %path.display(), rows = table.len(), "wrote margin history");
    Ok(())
}

/// Serialize `table` to CSV text.
pub fn to_csv_string(table: &MarginTable) -> Result<String, csv::Error> {
    let mut data = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut data);
        write_rows(table, &mut wtr)?;
        wtr.flush()?;
    }
    Ok(String::from_utf8_lossy(&data).into_owned())
}

pub(crate) enum ReadError {
    Csv(csv::Error),
    Schema(SchemaError),
}

/// Pull header and records out of a CSV reader and build a validated table.
pub(crate) fn read_table<R: io::Read>(
    reader: &mut csv::Reader<R>,
) -> Result<MarginTable, ReadError> {
    let header: Vec<String> = reader
        .headers()
        .map_err(ReadError::Csv)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(ReadError::Csv)?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    let table = MarginTable::from_records(header, records).map_err(ReadError::Schema)?;
    table.validate().map_err(ReadError::Schema)?;
    Ok(table)
}

fn write_csv(table: &MarginTable, path: &Path) -> Result<(), StoreError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    write_rows(table, &mut wtr).map_err(|e| StoreError::csv(path, e))?;
    wtr.flush().map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

fn write_rows<W: io::Write>(table: &MarginTable, wtr: &mut csv::Writer<W>) -> Result<(), csv::Error> {
    wtr.write_record(table.columns())?;
    for record in table.to_records() {
        wtr.write_record(&record)?;
    }
    Ok(())
}

/// `{dir}/{file}.tmp`, next to the target so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::obs;

    #[test]
    fn csv_string_has_literal_header_and_time_format() {
        let table = MarginTable::with_required_columns(vec![obs("ES", 12100.0, 14)]);
        let text = to_csv_string(&table).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some(
                "Time,Exchange,Asset Class,Product Name,Product Code,Start Period,\
                 End Period,Maintenance,Currency,Maint. Vol. Scan"
            )
        );
        assert_eq!(
            lines.next(),
            Some("2024-03-01T14:00:00Z,CME,Equity,ES Futures,ES,03/2024,06/2024,12100,USD,")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn read_table_parses_in_memory_csv() {
        let text = "Time,Exchange,Asset Class,Product Name,Product Code,Start Period,\
                    End Period,Maintenance,Currency,Maint. Vol. Scan\n\
                    2024-03-01T14:00:00Z,CME,Equity,E-mini,ES,03/2024,06/2024,12100,USD,\n";
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let table = match read_table(&mut reader) {
            Ok(t) => t,
            Err(_) => panic!("expected a valid table"),
        };
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].maintenance, 12100.0);
    }

    #[test]
    fn read_table_reports_missing_column() {
        let text = "Time,Exchange\n2024-03-01T14:00:00Z,CME\n";
        let mut reader = csv::Reader::from_reader(text.as_bytes());
        assert!(matches!(
            read_table(&mut reader),
            Err(ReadError::Schema(SchemaError::MissingColumns(_)))
        ));
    }

    #[test]
    fn temp_path_sits_next_to_target() {
        let p = Path::new("/data/margins.csv");
        assert_eq!(temp_path(p), PathBuf::from("/data/margins.csv.tmp"));
    }

    #[test]
    fn write_rejects_invalid_table_without_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("margins.csv");
        let table = MarginTable::new(vec!["Time".into()], Vec::new());

        let err = write(&table, &path).unwrap_err();
        assert!(err.schema_error().is_some());
        assert!(!path.exists());
        assert!(!temp_path(&path).exists());
    }
}
