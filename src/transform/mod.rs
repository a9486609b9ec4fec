//! The CSV → Parquet transform step.
//!
//! One invocation reads a single CSV object, loads and checks it, encodes it
//! as Parquet and writes it to `tables/<base>/<base>.parquet` in the
//! destination bucket. [`TransformStep::handle`] is the boundary: it always
//! returns an [`InvocationResponse`], never an error.

pub mod request;

pub use request::{InvocationRequest, InvocationResponse, ResponseBody, TransformRequest};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::error::{Result, TransformError};
use crate::process::{
    codec::{encode_table, EncodeOptions, PARQUET_CONTENT_TYPE},
    load_csv, naming,
    quality::QualityReport,
};
use crate::storage::BlobStore;

pub const SUCCESS_MESSAGE: &str = "Successfully converted CSV to Parquet";

/// File key reported when the request carried none.
pub const UNKNOWN_FILE_KEY: &str = "unknown";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// In-memory output of [`convert`], ready to be written.
#[derive(Debug, Clone)]
pub struct Converted {
    pub output_key: String,
    pub encoded: Bytes,
    pub rows: usize,
    pub quality: QualityReport,
    pub input_bytes: usize,
}

/// Parse, validate and encode one CSV blob, and derive where it should be written.
///
/// Pure: no storage access. Any failure here leaves the destination untouched.
#[instrument(level = "info", skip(source_blob, options), fields(bytes = source_blob.len()))]
pub fn convert(
    source_blob: &[u8],
    source_name: &str,
    options: &EncodeOptions,
) -> Result<Converted> {
    info!("reading csv into table");
    let table = load_csv(source_blob)?;
    info!(
        rows = table.num_rows(),
        columns = table.columns().len(),
        names = ?table.column_names(),
        original_mb = bytes_to_mb(source_blob.len()),
        "loaded table"
    );

    info!("running data quality checks");
    let quality = QualityReport::from_table(&table);
    quality.log();

    info!("converting to parquet");
    let encoded = encode_table(&table, options)?;
    let output_key = naming::output_key(source_name);

    Ok(Converted {
        output_key,
        encoded,
        rows: table.num_rows(),
        quality,
        input_bytes: source_blob.len(),
    })
}

pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// `(1 - output / input) * 100`, unrounded and unclamped. Zero for empty input.
pub fn compression_ratio_percent(input_bytes: usize, output_bytes: usize) -> f64 {
    if input_bytes == 0 {
        return 0.0;
    }
    (1.0 - output_bytes as f64 / input_bytes as f64) * 100.0
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Summary of a successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    pub message: String,
    pub source_file: String,
    pub output_path: String,
    pub rows_processed: usize,
    pub original_size_mb: f64,
    pub parquet_size_mb: f64,
    pub compression_ratio_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl TransformResult {
    /// Sizes are rounded to two decimals and the ratio to one, both from exact byte counts.
    pub fn summarize(
        source_file: impl Into<String>,
        output_path: impl Into<String>,
        rows_processed: usize,
        input_bytes: usize,
        output_bytes: usize,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            message: SUCCESS_MESSAGE.to_string(),
            source_file: source_file.into(),
            output_path: output_path.into(),
            rows_processed,
            original_size_mb: round_to(bytes_to_mb(input_bytes), 2),
            parquet_size_mb: round_to(bytes_to_mb(output_bytes), 2),
            compression_ratio_percent: round_to(
                compression_ratio_percent(input_bytes, output_bytes),
                1,
            ),
            timestamp,
        }
    }
}

/// Error record returned in place of a [`TransformResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformFailure {
    pub error: String,
    pub file_key: String,
}

impl TransformFailure {
    pub fn new(err: &TransformError, file_key: Option<&str>) -> Self {
        Self {
            error: err.to_string(),
            file_key: file_key.unwrap_or(UNKNOWN_FILE_KEY).to_string(),
        }
    }
}

/// Runs invocations against an explicitly supplied storage handle.
#[derive(Clone)]
pub struct TransformStep {
    store: Arc<dyn BlobStore>,
    options: EncodeOptions,
}

impl TransformStep {
    pub fn new(store: Arc<dyn BlobStore>, options: EncodeOptions) -> Self {
        Self { store, options }
    }

    /// Download, convert, upload. One storage read and one write, no retries.
    #[instrument(level = "info", skip_all, fields(key = %request.object_key))]
    pub async fn transform(&self, request: &TransformRequest) -> Result<TransformResult> {
        let source = self.store.uri(&request.source_bucket, &request.object_key);
        info!(%source, "downloading csv");
        let source_blob = self
            .store
            .get(&request.source_bucket, &request.object_key)
            .await?;

        let converted = convert(&source_blob, &request.object_key, &self.options)?;
        let output_bytes = converted.encoded.len();

        let output_path = self
            .store
            .uri(&request.destination_bucket, &converted.output_key);
        info!(%output_path, bytes = output_bytes, "uploading parquet");
        self.store
            .put(
                &request.destination_bucket,
                &converted.output_key,
                converted.encoded,
                PARQUET_CONTENT_TYPE,
            )
            .await?;

        let result = TransformResult::summarize(
            &request.object_key,
            output_path,
            converted.rows,
            converted.input_bytes,
            output_bytes,
            Utc::now(),
        );
        info!(
            rows = result.rows_processed,
            parquet_mb = result.parquet_size_mb,
            "transformation completed: {:.1}% reduction",
            result.compression_ratio_percent
        );
        Ok(result)
    }

    /// Invocation boundary: validates the request, runs it, and folds any error
    /// into a failure record.
    pub async fn handle(&self, request: &InvocationRequest) -> InvocationResponse {
        let outcome = match request.validate() {
            Ok(validated) => self.transform(&validated).await,
            Err(err) => Err(err),
        };

        match outcome {
            Ok(result) => InvocationResponse::success(result),
            Err(err) => {
                error!(kind = err.kind(), error = %err, "transformation failed");
                InvocationResponse::failure(TransformFailure::new(&err, request.file_key()))
            }
        }
    }
}
