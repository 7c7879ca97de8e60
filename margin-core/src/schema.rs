use crate::domain::columns;

/// Expected schema for margin tables
pub struct MarginSchema;

impl MarginSchema {
    /// The required column labels, in canonical order
    pub fn required() -> &'static [&'static str] {
        &columns::REQUIRED
    }

    /// Validate a column list against the schema.
    ///
    /// Extra columns are accepted. Every missing column is reported, not just the first.
    pub fn validate<S: AsRef<str>>(actual: &[S]) -> Result<(), SchemaError> {
        let missing: Vec<String> = Self::required()
            .iter()
            .filter(|name| !actual.iter().any(|c| c.as_ref() == **name))
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns(missing))
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Invalid value in column {column} at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },
}
