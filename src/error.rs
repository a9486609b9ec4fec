//! Error taxonomy for the transform step.

use parquet::errors::ParquetError;
use thiserror::Error;

/// Every way a single transform invocation can fail.
///
/// The invocation boundary turns any of these into a [`TransformFailure`] record;
/// nothing below it panics or retries.
///
/// [`TransformFailure`]: crate::transform::TransformFailure
#[derive(Debug, Error)]
pub enum TransformError {
    /// A required request field was absent or empty. Raised before any storage call.
    #[error("Missing required parameters: {}", .0.join(", "))]
    MissingParameter(Vec<&'static str>),

    /// The input is not valid delimited text.
    #[error("CSV parse error: {0}")]
    Parse(String),

    /// The header row is unusable (duplicate or empty column names).
    #[error("Schema error: {0}")]
    Schema(String),

    /// A storage read or write failed.
    #[error("Storage error at {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: object_store::Error,
    },

    /// The table could not be serialized to Parquet.
    #[error("Parquet encoding failed: {0}")]
    Encode(#[from] ParquetError),
}

impl TransformError {
    /// Short, stable name of the error class, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            TransformError::MissingParameter(_) => "MissingParameterError",
            TransformError::Parse(_) => "ParseError",
            TransformError::Schema(_) => "SchemaError",
            TransformError::Io { .. } => "IOError",
            TransformError::Encode(_) => "EncodeError",
        }
    }
}

impl From<csv::Error> for TransformError {
    fn from(err: csv::Error) -> Self {
        TransformError::Parse(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for TransformError {
    fn from(err: arrow::error::ArrowError) -> Self {
        TransformError::Encode(ParquetError::from(err))
    }
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_parameter_lists_fields() {
        let err = TransformError::MissingParameter(vec!["source_bucket_id", "object_key"]);
        assert_eq!(
            err.to_string(),
            "Missing required parameters: source_bucket_id, object_key"
        );
        assert_eq!(err.kind(), "MissingParameterError");
    }

    #[test]
    fn test_arrow_errors_map_to_encode() {
        let err = TransformError::from(arrow::error::ArrowError::SchemaError("bad".into()));
        assert_eq!(err.kind(), "EncodeError");
    }
}
