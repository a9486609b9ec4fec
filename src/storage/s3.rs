//! S3 backend.

use object_store::aws::AmazonS3Builder;
use object_store::{ObjectStore, RetryConfig};
use std::sync::Arc;

/// S3 connection settings shared by every bucket. Credentials come from the
/// standard `AWS_*` environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3Config {
    pub region: Option<String>,
    /// Custom endpoint (e.g. MinIO or LocalStack); enables path-style plain-HTTP access.
    pub endpoint: Option<String>,
}

pub(super) fn store_for(
    config: &S3Config,
    bucket: &str,
) -> object_store::Result<Arc<dyn ObjectStore>> {
    // one attempt per invocation
    let retry = RetryConfig {
        max_retries: 0,
        ..Default::default()
    };
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_retry(retry);

    if let Some(region) = &config.region {
        builder = builder.with_region(region);
    }
    if let Some(endpoint) = &config.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(true);
    }

    Ok(Arc::new(builder.build()?))
}
