//! Error types for the query compiler.

/// Errors from compiling an utterance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Unknown context: {0}")]
    UnknownContext(String),
    #[error("No column of {0} mentioned in the request")]
    ColumnNotFound(String),
    #[error("No value given for column {0}")]
    MissingValue(String),
    #[error("Cannot use '{value}' as an INTEGER value for column {column}")]
    ValueParseError { column: String, value: String },
    #[error("Update requests need both a SET clause and a WHERE clause")]
    IncompleteUpdate,
}
