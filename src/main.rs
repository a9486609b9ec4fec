use anyhow::Result;
use std::sync::Arc;
use tabular_etl::{
    config::ServiceConfig,
    logging,
    storage::StorageProvider,
    transform::{InvocationRequest, TransformStep},
};
use tracing::info;
use warp::{http::StatusCode, reject::Rejection, reply::Reply, Filter};

async fn health_check() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "csv-to-parquet-transform"
    })))
}

async fn transform(
    step: Arc<TransformStep>,
    req: InvocationRequest,
) -> Result<impl Reply, Rejection> {
    let response = step.handle(&req).await;
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(warp::reply::with_status(warp::reply::json(&response), status))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::from_env()?;
    logging::init(&config.log_level);
    info!(
        storage = ?config.storage,
        compression = %config.encode.compression,
        "starting transform service"
    );

    let store = Arc::new(StorageProvider::new(config.storage.clone()));
    let step = Arc::new(TransformStep::new(store, config.encode.clone()));
    let with_step = warp::any().map(move || step.clone());

    let health = warp::path("health").and(warp::get()).and_then(health_check);

    let process = warp::path("transform")
        .and(warp::post())
        .and(with_step)
        .and(warp::body::json())
        .and_then(transform);

    let routes = health.or(process);

    info!("Server starting on port {}", config.port);
    info!("Health check: http://localhost:{}/health", config.port);
    info!("Transform endpoint: POST http://localhost:{}/transform", config.port);

    warp::serve(routes).run(([0, 0, 0, 0], config.port)).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tabular_etl::process::codec::EncodeOptions;
    use tabular_etl::storage::BlobStore;
    use tabular_etl::transform::{InvocationResponse, ResponseBody};

    #[tokio::test]
    async fn test_health_check() {
        let result = health_check().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_transform_route_status_codes() -> Result<()> {
        let store = Arc::new(StorageProvider::in_memory());
        store
            .put("raw", "orders.csv", Bytes::from_static(b"id\n1\n"), "text/csv")
            .await?;
        let step = Arc::new(TransformStep::new(store, EncodeOptions::default()));
        let with_step = warp::any().map(move || step.clone());
        let route = warp::path("transform")
            .and(warp::post())
            .and(with_step)
            .and(warp::body::json())
            .and_then(transform);

        let ok = warp::test::request()
            .method("POST")
            .path("/transform")
            .json(&InvocationRequest::new("raw", "processed", "orders.csv"))
            .reply(&route)
            .await;
        assert_eq!(ok.status(), StatusCode::OK);
        let body: InvocationResponse = serde_json::from_slice(ok.body())?;
        assert!(matches!(body.body, ResponseBody::Success(_)));

        let failed = warp::test::request()
            .method("POST")
            .path("/transform")
            .json(&serde_json::json!({"object_key": "orders.csv"}))
            .reply(&route)
            .await;
        assert_eq!(failed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        Ok(())
    }
}
