use arrow::{
    array::{
        ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
    },
    datatypes::{Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;

use crate::process::{date_parser, ColumnValues, Table};

/// Arrow schema for `table`: one nullable field per column, in table order.
pub fn arrow_schema(table: &Table) -> Schema {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .map(|c| Field::new(&c.name, c.column_type().arrow_type(), true))
        .collect();
    Schema::new(fields)
}

fn to_array(values: &ColumnValues) -> ArrayRef {
    match values {
        ColumnValues::Integer(v) => Arc::new(Int64Array::from(v.clone())),
        ColumnValues::Float(v) => Arc::new(Float64Array::from(v.clone())),
        ColumnValues::Boolean(v) => Arc::new(BooleanArray::from(v.clone())),
        ColumnValues::Timestamp(v) => Arc::new(TimestampMicrosecondArray::from(
            v.iter()
                .map(|ts| ts.as_ref().map(date_parser::to_micros))
                .collect::<Vec<_>>(),
        )),
        ColumnValues::Text(v) => Arc::new(v.iter().map(|s| s.as_deref()).collect::<StringArray>()),
        ColumnValues::NullOnly(n) => Arc::new(StringArray::new_null(*n)),
    }
}

/// Convert the whole table into a single Arrow record batch.
pub fn table_to_record_batch(table: &Table) -> Result<RecordBatch, ArrowError> {
    let schema = Arc::new(arrow_schema(table));
    let columns: Vec<ArrayRef> = table.columns().iter().map(|c| to_array(&c.values)).collect();
    RecordBatch::try_new(schema, columns)
}
