use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::collections::HashSet;
use tracing::{debug, instrument};

use crate::error::{Result, TransformError};

pub mod codec;
pub mod convert;
pub mod date_parser;
pub mod naming;
pub mod quality;
pub mod schema;
pub mod utils;

pub use schema::ColumnType;

/// Typed cells of one column. `None` is the null marker.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Integer(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    Text(Vec<Option<String>>),
    /// A column with no non-null cell; only the length is kept.
    NullOnly(usize),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Integer(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Boolean(v) => v.len(),
            ColumnValues::Timestamp(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
            ColumnValues::NullOnly(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnValues::Integer(_) => ColumnType::Integer,
            ColumnValues::Float(_) => ColumnType::Float,
            ColumnValues::Boolean(_) => ColumnType::Boolean,
            ColumnValues::Timestamp(_) => ColumnType::Timestamp,
            ColumnValues::Text(_) => ColumnType::Text,
            ColumnValues::NullOnly(_) => ColumnType::NullOnly,
        }
    }

    pub fn null_count(&self) -> usize {
        fn nulls<T>(v: &[Option<T>]) -> usize {
            v.iter().filter(|c| c.is_none()).count()
        }
        match self {
            ColumnValues::Integer(v) => nulls(v),
            ColumnValues::Float(v) => nulls(v),
            ColumnValues::Boolean(v) => nulls(v),
            ColumnValues::Timestamp(v) => nulls(v),
            ColumnValues::Text(v) => nulls(v),
            ColumnValues::NullOnly(n) => *n,
        }
    }

    /// Build typed cells from raw tokens once the column type is known.
    ///
    /// Every non-null token is known to parse as `ty`; a token that somehow
    /// doesn't is stored as null rather than failing the load.
    fn from_tokens(ty: ColumnType, tokens: Vec<Option<String>>) -> Self {
        match ty {
            ColumnType::Integer => ColumnValues::Integer(
                tokens
                    .iter()
                    .map(|t| t.as_deref().and_then(|s| s.trim().parse().ok()))
                    .collect(),
            ),
            ColumnType::Float => ColumnValues::Float(
                tokens
                    .iter()
                    .map(|t| t.as_deref().and_then(|s| s.trim().parse().ok()))
                    .collect(),
            ),
            ColumnType::Boolean => ColumnValues::Boolean(
                tokens
                    .iter()
                    .map(|t| t.as_deref().and_then(|s| utils::parse_bool(s.trim())))
                    .collect(),
            ),
            ColumnType::Timestamp => ColumnValues::Timestamp(
                tokens
                    .iter()
                    .map(|t| t.as_deref().and_then(date_parser::parse_timestamp))
                    .collect(),
            ),
            ColumnType::Text => ColumnValues::Text(tokens),
            ColumnType::NullOnly => ColumnValues::NullOnly(tokens.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: ColumnValues,
}

impl Column {
    pub fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn column_type(&self) -> ColumnType {
        self.values.column_type()
    }
}

/// An ordered set of uniquely named columns sharing one row count.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Assemble a table, checking names are non-empty and unique and that every
    /// column has the same length.
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        check_column_names(columns.iter().map(|c| c.name.as_str()))?;

        let num_rows = columns.first().map(|c| c.values.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.values.len() != num_rows) {
            return Err(TransformError::Schema(format!(
                "column '{}' has {} rows, expected {}",
                bad.name,
                bad.values.len(),
                num_rows
            )));
        }

        Ok(Self { columns, num_rows })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }
}

/// Header names must be non-empty and unique.
fn check_column_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for (idx, name) in names.into_iter().enumerate() {
        if name.trim().is_empty() {
            return Err(TransformError::Schema(format!(
                "column {} has an empty name",
                idx + 1
            )));
        }
        if !seen.insert(name) {
            return Err(TransformError::Schema(format!(
                "duplicate column name '{}'",
                name
            )));
        }
    }
    Ok(())
}

/// Load comma-separated UTF-8 text (header row + data rows) into a [`Table`].
///
/// - The header is validated before any data row is read.
/// - Every data row must carry exactly as many fields as the header.
/// - Column types are inferred in a second pass over the collected tokens.
#[instrument(level = "info", skip(data), fields(bytes = data.len()))]
pub fn load_csv(data: &[u8]) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(TransformError::Parse("missing header row".into()));
    }
    check_column_names(headers.iter().map(String::as_str))?;

    // 1) collect raw tokens column-major
    let mut tokens: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result?;
        for (col, field) in tokens.iter_mut().zip(record.iter()) {
            if utils::is_null_token(field) {
                col.push(None);
            } else {
                col.push(Some(field.to_string()));
            }
        }
    }

    // 2) classify each column and build its typed cells
    let columns = headers
        .into_iter()
        .zip(tokens)
        .map(|(name, col_tokens)| {
            let ty = schema::infer_column_type(&col_tokens);
            debug!(column = %name, ty = %ty, "inferred column type");
            Column::new(name, ColumnValues::from_tokens(ty, col_tokens))
        })
        .collect();

    Table::try_new(columns)
}
