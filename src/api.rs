//! HTTP surface of the document processor.
//!
//! - `POST /webhook` – Receive an object-storage notification. Upload and delete events are
//!   acknowledged immediately with `{"status": "processing", "bucket", "filename"}` and handed
//!   to the pipeline in the background; anything else is answered with
//!   `{"status": "ignored", "reason"}`. Malformed payloads are ignored rather than rejected so
//!   the notification source does not retry them.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Pipeline counters.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Semaphore;

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    DocumentProcessor, EventKind, Notification, StorageEvent, parse_notification,
};

/// Shared handler state: the pipeline and the permits bounding concurrent runs.
struct AppState<P> {
    processor: Arc<P>,
    permits: Arc<Semaphore>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            permits: Arc::clone(&self.permits),
        }
    }
}

/// Build the HTTP router; at most `max_concurrency` documents are processed at once.
pub fn create_router<P>(processor: Arc<P>, max_concurrency: usize) -> Router
where
    P: DocumentProcessor + 'static,
{
    let state = AppState {
        processor,
        permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
    };
    Router::new()
        .route("/webhook", post(receive_notification::<P>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<P>))
        .with_state(state)
}

/// Accept a notification and schedule the matching pipeline run.
async fn receive_notification<P>(State(state): State<AppState<P>>, body: Bytes) -> Json<Value>
where
    P: DocumentProcessor + 'static,
{
    let event = match parse_notification(&body) {
        Ok(Notification::Event(event)) => event,
        Ok(Notification::Ignored(reason)) => {
            tracing::info!(%reason, "Ignoring notification");
            return Json(json!({"status": "ignored", "reason": reason}));
        }
        Err(error) => {
            tracing::warn!(%error, "Failed to parse notification");
            return Json(json!({"status": "ignored", "reason": error.to_string()}));
        }
    };

    let response = json!({
        "status": "processing",
        "bucket": event.index_name,
        "filename": event.filename,
    });
    tracing::info!(
        index = %event.index_name,
        filename = %event.filename,
        kind = ?event.kind,
        "Scheduling document event"
    );
    tokio::spawn(run_event(state, event));
    Json(response)
}

async fn run_event<P>(state: AppState<P>, event: StorageEvent)
where
    P: DocumentProcessor,
{
    let Ok(_permit) = state.permits.acquire_owned().await else {
        tracing::warn!(filename = %event.filename, "Pipeline closed; dropping event");
        return;
    };
    let StorageEvent {
        kind,
        index_name,
        filename,
    } = event;
    // Failures are already logged and reported by the pipeline.
    match kind {
        EventKind::Created => {
            let _ = state.processor.process_upload(&index_name, &filename).await;
        }
        EventKind::Removed => {
            let _ = state.processor.process_delete(&index_name, &filename).await;
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "document processor is running",
    })
}

async fn get_metrics<P>(State(state): State<AppState<P>>) -> Json<MetricsSnapshot>
where
    P: DocumentProcessor,
{
    Json(state.processor.metrics_snapshot())
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{DeleteOutcome, DocumentProcessor, PipelineError, UploadOutcome};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{Mutex, mpsc};
    use tower::ServiceExt;

    #[derive(Debug, PartialEq, Eq)]
    enum Call {
        Upload(String, String),
        Delete(String, String),
    }

    struct StubProcessor {
        calls: mpsc::UnboundedSender<Call>,
        deletes: Mutex<u64>,
    }

    impl StubProcessor {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Call>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    calls: tx,
                    deletes: Mutex::new(0),
                }),
                rx,
            )
        }
    }

    #[async_trait]
    impl DocumentProcessor for StubProcessor {
        async fn process_upload(
            &self,
            index_name: &str,
            filename: &str,
        ) -> Result<UploadOutcome, PipelineError> {
            let _ = self
                .calls
                .send(Call::Upload(index_name.into(), filename.into()));
            Ok(UploadOutcome {
                index_name: index_name.into(),
                filename: filename.into(),
                chunk_count: 1,
            })
        }

        async fn process_delete(
            &self,
            index_name: &str,
            filename: &str,
        ) -> Result<DeleteOutcome, PipelineError> {
            *self.deletes.lock().await += 1;
            let _ = self
                .calls
                .send(Call::Delete(index_name.into(), filename.into()));
            Ok(DeleteOutcome {
                index_name: index_name.into(),
                filename: filename.into(),
                deleted_rows: 0,
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 3,
                documents_failed: 1,
                documents_deleted: 0,
                chunks_stored: 12,
            }
        }
    }

    async fn send(app: axum::Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(body)
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    async fn next_call(rx: &mut mpsc::UnboundedReceiver<Call>) -> Call {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("pipeline invoked")
            .expect("channel open")
    }

    #[tokio::test]
    async fn upload_event_is_acknowledged_and_processed() {
        let (processor, mut rx) = StubProcessor::new();
        let app = create_router(processor, 2);
        let payload = json!({"EventName": "s3:ObjectCreated:Put", "Key": "handbook/leave.md"});

        let (status, body) = send(app, Method::POST, "/webhook", Body::from(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"status": "processing", "bucket": "handbook", "filename": "leave.md"})
        );
        assert_eq!(
            next_call(&mut rx).await,
            Call::Upload("handbook".into(), "leave.md".into())
        );
    }

    #[tokio::test]
    async fn delete_record_is_dispatched_to_delete() {
        let (processor, mut rx) = StubProcessor::new();
        let app = create_router(processor.clone(), 1);
        let payload = json!({
            "Records": [{
                "eventName": "s3:ObjectRemoved:Delete",
                "s3": {"bucket": {"name": "handbook"}, "object": {"key": "old.txt"}}
            }]
        });

        let (status, _) = send(app, Method::POST, "/webhook", Body::from(payload.to_string())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            next_call(&mut rx).await,
            Call::Delete("handbook".into(), "old.txt".into())
        );
        assert_eq!(*processor.deletes.lock().await, 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_ignored_not_rejected() {
        let (processor, mut rx) = StubProcessor::new();
        let app = create_router(processor, 1);

        let (status, body) = send(app, Method::POST, "/webhook", Body::from("{not json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ignored");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn metadata_notification_is_ignored() {
        let (processor, _rx) = StubProcessor::new();
        let app = create_router(processor, 1);
        let payload = json!({"EventName": "s3:ObjectCreated:Put", "Key": "handbook/.metadata.json"});

        let (_, body) = send(app, Method::POST, "/webhook", Body::from(payload.to_string())).await;

        assert_eq!(body, json!({"status": "ignored", "reason": "metadata file"}));
    }

    #[tokio::test]
    async fn health_and_metrics_respond() {
        let (processor, _rx) = StubProcessor::new();
        let app = create_router(processor, 1);

        let (status, body) = send(app.clone(), Method::GET, "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(app, Method::GET, "/metrics", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["documents_processed"], 3);
        assert_eq!(body["chunks_stored"], 12);
    }
}
