//! Parquet encode/decode of a loaded [`Table`].

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::{Compression, ZstdLevel},
    errors::ParquetError,
    file::properties::WriterProperties,
};
use std::{fmt, str::FromStr, sync::Arc};
use tracing::{debug, instrument};

use crate::process::{convert::table_to_record_batch, Table};

/// File extension of the columnar output.
pub const PARQUET_EXTENSION: &str = "parquet";

/// Content type attached to written objects.
pub const PARQUET_CONTENT_TYPE: &str = "application/octet-stream";

/// Block codec applied to every column chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParquetCompression {
    #[default]
    Snappy,
    Lz4,
    Zstd,
    Uncompressed,
}

impl ParquetCompression {
    fn to_parquet(self) -> Compression {
        match self {
            ParquetCompression::Snappy => Compression::SNAPPY,
            ParquetCompression::Lz4 => Compression::LZ4_RAW,
            ParquetCompression::Zstd => Compression::ZSTD(ZstdLevel::default()),
            ParquetCompression::Uncompressed => Compression::UNCOMPRESSED,
        }
    }
}

impl FromStr for ParquetCompression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snappy" => Ok(ParquetCompression::Snappy),
            "lz4" | "lz4_raw" => Ok(ParquetCompression::Lz4),
            "zstd" => Ok(ParquetCompression::Zstd),
            "none" | "uncompressed" => Ok(ParquetCompression::Uncompressed),
            other => Err(format!("unknown parquet compression '{}'", other)),
        }
    }
}

impl fmt::Display for ParquetCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParquetCompression::Snappy => "snappy",
            ParquetCompression::Lz4 => "lz4",
            ParquetCompression::Zstd => "zstd",
            ParquetCompression::Uncompressed => "uncompressed",
        };
        f.write_str(s)
    }
}

/// Writer settings for the encoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub compression: ParquetCompression,
    /// Rows per row group; the parquet default applies when unset.
    pub max_row_group_size: Option<usize>,
}

impl EncodeOptions {
    fn writer_properties(&self) -> WriterProperties {
        let mut builder =
            WriterProperties::builder().set_compression(self.compression.to_parquet());
        if let Some(rows) = self.max_row_group_size {
            builder = builder.set_max_row_group_size(rows.max(1));
        }
        builder.build()
    }
}

/// Serialize `table` into an in-memory Parquet file.
#[instrument(
    level = "debug",
    skip_all,
    fields(rows = table.num_rows(), compression = %options.compression)
)]
pub fn encode_table(table: &Table, options: &EncodeOptions) -> Result<Bytes, ParquetError> {
    let batch = table_to_record_batch(table)?;

    let props = options.writer_properties();
    let mut writer = ArrowWriter::try_new(Vec::new(), batch.schema(), Some(props))?;
    writer.write(&batch)?;
    let buf = writer.into_inner()?;

    debug!(bytes = buf.len(), "encoded parquet");
    Ok(Bytes::from(buf))
}

/// Read a Parquet buffer back into record batches.
pub fn decode(data: Bytes) -> Result<Vec<RecordBatch>, ParquetError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)?.build()?;
    reader
        .collect::<Result<Vec<_>, _>>()
        .map_err(ParquetError::from)
}

/// Total rows across decoded batches.
pub fn total_rows(batches: &[RecordBatch]) -> usize {
    batches.iter().map(RecordBatch::num_rows).sum()
}

/// Schema shared by decoded batches, if any were produced.
pub fn decoded_schema(batches: &[RecordBatch]) -> Option<Arc<arrow::datatypes::Schema>> {
    batches.first().map(RecordBatch::schema)
}
