use serde::{Deserialize, Serialize};

use crate::error::{Result, TransformError};
use crate::transform::{TransformFailure, TransformResult};

/// Raw invocation event. Field aliases accept the older
/// `raw_bucket` / `processed_bucket` / `file_key` event shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(default, alias = "raw_bucket", skip_serializing_if = "Option::is_none")]
    pub source_bucket_id: Option<String>,
    #[serde(default, alias = "processed_bucket", skip_serializing_if = "Option::is_none")]
    pub destination_bucket_id: Option<String>,
    #[serde(default, alias = "file_key", skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
}

/// A request with every required identifier present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub source_bucket: String,
    pub destination_bucket: String,
    pub object_key: String,
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

impl InvocationRequest {
    pub fn new(
        source_bucket_id: impl Into<String>,
        destination_bucket_id: impl Into<String>,
        object_key: impl Into<String>,
    ) -> Self {
        Self {
            source_bucket_id: Some(source_bucket_id.into()),
            destination_bucket_id: Some(destination_bucket_id.into()),
            object_key: Some(object_key.into()),
        }
    }

    /// Check every identifier is present and non-blank, naming all that are not.
    pub fn validate(&self) -> Result<TransformRequest> {
        match (
            present(&self.source_bucket_id),
            present(&self.destination_bucket_id),
            present(&self.object_key),
        ) {
            (Some(source), Some(destination), Some(key)) => Ok(TransformRequest {
                source_bucket: source.to_string(),
                destination_bucket: destination.to_string(),
                object_key: key.to_string(),
            }),
            (source, destination, key) => {
                let missing = [
                    ("source_bucket_id", source.is_none()),
                    ("destination_bucket_id", destination.is_none()),
                    ("object_key", key.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(TransformError::MissingParameter(missing))
            }
        }
    }

    /// Identifier reported in failure records.
    pub fn file_key(&self) -> Option<&str> {
        present(&self.object_key)
    }
}

/// Outcome of one invocation: `200` with a [`TransformResult`] or `500` with a
/// [`TransformFailure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub status: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Success(TransformResult),
    Failure(TransformFailure),
}

impl InvocationResponse {
    pub const OK: u16 = 200;
    pub const FAILED: u16 = 500;

    pub fn success(result: TransformResult) -> Self {
        Self {
            status: Self::OK,
            body: ResponseBody::Success(result),
        }
    }

    pub fn failure(failure: TransformFailure) -> Self {
        Self {
            status: Self::FAILED,
            body: ResponseBody::Failure(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_validate_complete_request() -> Result<()> {
        let req = InvocationRequest::new("raw", "processed", "orders.csv").validate()?;
        assert_eq!(req.source_bucket, "raw");
        assert_eq!(req.destination_bucket, "processed");
        assert_eq!(req.object_key, "orders.csv");
        Ok(())
    }

    #[test]
    fn test_validate_names_every_missing_field() {
        let req = InvocationRequest {
            destination_bucket_id: Some("processed".into()),
            object_key: Some("  ".into()),
            ..Default::default()
        };
        match req.validate() {
            Err(TransformError::MissingParameter(fields)) => {
                assert_eq!(fields, vec!["source_bucket_id", "object_key"]);
            }
            other => panic!("expected missing parameter, got {other:?}"),
        }
        assert_eq!(req.file_key(), None);
    }

    #[test]
    fn test_deserialize_both_event_shapes() -> Result<()> {
        let current: InvocationRequest = serde_json::from_str(
            r#"{"source_bucket_id":"raw","destination_bucket_id":"out","object_key":"a.csv"}"#,
        )?;
        let legacy: InvocationRequest = serde_json::from_str(
            r#"{"raw_bucket":"raw","processed_bucket":"out","file_key":"a.csv"}"#,
        )?;
        assert_eq!(current, legacy);

        let partial: InvocationRequest = serde_json::from_str(r#"{"object_key":"a.csv"}"#)?;
        assert_eq!(partial.source_bucket_id, None);
        Ok(())
    }

    #[test]
    fn test_failure_response_shape() -> Result<()> {
        let response = InvocationResponse::failure(TransformFailure {
            error: "boom".into(),
            file_key: "unknown".into(),
        });
        let json = serde_json::to_value(&response)?;
        assert_eq!(
            json,
            serde_json::json!({"status": 500, "body": {"error": "boom", "file_key": "unknown"}})
        );
        assert!(matches!(response.body, ResponseBody::Failure(_)));
        Ok(())
    }
}
