use arrow::datatypes::{DataType, TimeUnit};
use serde::Serialize;
use std::fmt;

use crate::process::{date_parser, utils::parse_bool};

/// Type classified for a whole column at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Timestamp,
    Text,
    /// Every cell in the column is null.
    NullOnly,
}

impl ColumnType {
    /// Arrow type the column is encoded as.
    ///
    /// Null-only columns are written as nullable UTF-8 so readers see a concrete
    /// physical type with every cell null.
    pub fn arrow_type(&self) -> DataType {
        match self {
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
            ColumnType::Text | ColumnType::NullOnly => DataType::Utf8,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Text => "text",
            ColumnType::NullOnly => "null",
        };
        f.write_str(s)
    }
}

/// Classify a column from its raw tokens (`None` is a null cell).
///
/// Candidates are narrowed token by token in the order integer, float, boolean,
/// timestamp; the first token that rules out all of them makes the column text.
pub fn infer_column_type(tokens: &[Option<String>]) -> ColumnType {
    let mut seen = false;
    let (mut integer, mut float, mut boolean, mut timestamp) = (true, true, true, true);

    for raw in tokens.iter().flatten() {
        let s = raw.trim();
        seen = true;
        if integer && s.parse::<i64>().is_err() {
            integer = false;
            // an integer literal past i64 has no exact float form either
            if is_integer_literal(s) {
                float = false;
            }
        }
        if float && s.parse::<f64>().is_err() {
            float = false;
        }
        if boolean && parse_bool(s).is_none() {
            boolean = false;
        }
        if timestamp && date_parser::parse_timestamp(s).is_none() {
            timestamp = false;
        }
        if !(integer || float || boolean || timestamp) {
            return ColumnType::Text;
        }
    }

    if !seen {
        ColumnType::NullOnly
    } else if integer {
        ColumnType::Integer
    } else if float {
        ColumnType::Float
    } else if boolean {
        ColumnType::Boolean
    } else if timestamp {
        ColumnType::Timestamp
    } else {
        ColumnType::Text
    }
}

/// Optional sign followed by one or more ASCII digits.
fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(str::to_string)).collect()
    }

    #[test]
    fn test_numeric_columns() {
        assert_eq!(
            infer_column_type(&toks(&[Some("1"), None, Some(" 42 ")])),
            ColumnType::Integer
        );
        assert_eq!(
            infer_column_type(&toks(&[Some("1"), Some("2.5")])),
            ColumnType::Float
        );
    }

    #[test]
    fn test_integers_beyond_i64_stay_text() {
        assert_eq!(
            infer_column_type(&toks(&[Some("1"), Some("12345678901234567891")])),
            ColumnType::Text
        );
        assert_eq!(
            infer_column_type(&toks(&[Some("-99999999999999999999")])),
            ColumnType::Text
        );
        // a decimal point makes it a float literal, not an integer one
        assert_eq!(
            infer_column_type(&toks(&[Some("12345678901234567891.5")])),
            ColumnType::Float
        );
    }

    #[test]
    fn test_timestamps_needing_more_than_micros_stay_text() {
        assert_eq!(
            infer_column_type(&toks(&[Some("2017-10-02 10:56:33.123456789")])),
            ColumnType::Text
        );
        assert_eq!(
            infer_column_type(&toks(&[Some("2017-10-02T20:56:33+10:00")])),
            ColumnType::Text
        );
        assert_eq!(
            infer_column_type(&toks(&[Some("2017-10-02 10:56:33.123456")])),
            ColumnType::Timestamp
        );
    }

    #[test]
    fn test_boolean_and_timestamp_columns() {
        assert_eq!(
            infer_column_type(&toks(&[Some("true"), Some("FALSE")])),
            ColumnType::Boolean
        );
        assert_eq!(
            infer_column_type(&toks(&[Some("2018-01-01 10:00:00"), Some("2018-01-02")])),
            ColumnType::Timestamp
        );
    }

    #[test]
    fn test_first_mismatch_falls_back_to_text() {
        assert_eq!(
            infer_column_type(&toks(&[Some("1"), Some("two"), Some("3")])),
            ColumnType::Text
        );
        assert_eq!(
            infer_column_type(&toks(&[Some("true"), Some("1")])),
            ColumnType::Text
        );
    }

    #[test]
    fn test_all_null_column() {
        assert_eq!(infer_column_type(&toks(&[None, None])), ColumnType::NullOnly);
        assert_eq!(infer_column_type(&[]), ColumnType::NullOnly);
        assert_eq!(ColumnType::NullOnly.arrow_type(), DataType::Utf8);
    }
}
