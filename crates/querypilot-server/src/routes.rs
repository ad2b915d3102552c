//! HTTP routes and the NDJSON streaming adapter.
//!
//! `POST /process` validates the inbound request, spawns the pipeline,
//! and turns its step events into a chunked body of newline-delimited
//! JSON objects. Introspection and gateway failures after streaming has
//! begun surface as one generic error line; details go to the log only.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::error;

use querypilot_agent::{Pipeline, StepEvent, StepSink};

pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/process", post(process))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn process(State(pipeline): State<Arc<Pipeline>>, Json(body): Json<Value>) -> Response {
    let Some(query) = body.get("query").and_then(Value::as_str).map(str::to_string) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query is required and must be a string" })),
        )
            .into_response();
    };

    let (sink, rx) = StepSink::channel();
    tokio::spawn(async move {
        if let Err(e) = pipeline.run(&query, &sink).await {
            error!(error = %e, "pipeline failed");
            sink.emit(StepEvent::Error("internal server error".into()));
        }
    });

    let stream = UnboundedReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(format!("{}\n", event.to_json())));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use querypilot_ai::{OpenAiClient, OpenAiConfig};

    fn test_router() -> Router {
        // Points at nothing; the paths under test never reach the model.
        let client = Arc::new(OpenAiClient::new(OpenAiConfig::new("test-model")));
        router(Arc::new(Pipeline::with_postgres_tools(client)))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn missing_query_is_a_client_error() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].as_str().unwrap().contains("query"));
    }

    #[tokio::test]
    async fn non_string_query_is_a_client_error() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/process")
                    .header("content-type", "application/json")
                    .body(Body::from("{\"query\": 42}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
