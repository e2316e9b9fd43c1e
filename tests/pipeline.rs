use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use docrag::{
    controller::{ControllerError, DocumentStatus, StatusSink},
    embedding::{EmbeddingClient, HashEmbeddingClient},
    extract::{ExtractError, ExtractorRegistry},
    objects::{ObjectStorage, ObjectStorageError},
    processing::{DocumentPipeline, DocumentProcessor, PipelineError, SentenceChunker},
    store::{MemoryVectorStore, VectorStore},
};
use tokio::sync::Mutex;

const DIMENSION: usize = 16;

#[derive(Default)]
struct StubObjects {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl StubObjects {
    fn with(mut self, bucket: &str, key: &str, body: &str) -> Self {
        self.objects
            .insert((bucket.into(), key.into()), body.as_bytes().to_vec());
        self
    }
}

#[async_trait]
impl ObjectStorage for StubObjects {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStorageError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ObjectStorageError::NotFound {
                bucket: bucket.into(),
                key: key.into(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusEvent {
    Report(String, String, DocumentStatus),
    Clear(String, String),
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<StatusEvent>>,
    fail: bool,
}

impl RecordingSink {
    async fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn report(
        &self,
        index_name: &str,
        filename: &str,
        status: &DocumentStatus,
    ) -> Result<(), ControllerError> {
        if self.fail {
            return Err(ControllerError::Timeout);
        }
        self.events.lock().await.push(StatusEvent::Report(
            index_name.into(),
            filename.into(),
            status.clone(),
        ));
        Ok(())
    }

    async fn clear(&self, index_name: &str, filename: &str) -> Result<(), ControllerError> {
        if self.fail {
            return Err(ControllerError::Timeout);
        }
        self.events
            .lock()
            .await
            .push(StatusEvent::Clear(index_name.into(), filename.into()));
        Ok(())
    }
}

struct Fixture {
    pipeline: DocumentPipeline,
    store: Arc<MemoryVectorStore>,
    sink: Arc<RecordingSink>,
}

fn fixture(objects: StubObjects, target_size: usize, sink: RecordingSink) -> Fixture {
    let store = Arc::new(MemoryVectorStore::new(DIMENSION));
    let sink = Arc::new(sink);
    let pipeline = DocumentPipeline::new(
        Arc::new(objects),
        Arc::new(ExtractorRegistry::with_defaults()),
        SentenceChunker::new(target_size, 0).unwrap(),
        Arc::new(HashEmbeddingClient::new(DIMENSION)),
        store.clone(),
        sink.clone(),
    );
    Fixture {
        pipeline,
        store,
        sink,
    }
}

async fn probe(text: &str) -> Vec<f32> {
    HashEmbeddingClient::new(DIMENSION).embed(text).await.unwrap()
}

#[tokio::test]
async fn upload_then_delete_leaves_no_rows() {
    let objects = StubObjects::default().with("idx", "doc.txt", "A. B. C.");
    let Fixture {
        pipeline,
        store,
        sink,
    } = fixture(objects, 1, RecordingSink::default());

    let outcome = pipeline.process_upload("idx", "doc.txt").await.unwrap();
    assert!(outcome.chunk_count > 1);

    let stored = store.document_chunks("idx", "doc.txt").await.unwrap();
    assert_eq!(stored.len(), outcome.chunk_count);
    let texts: Vec<_> = stored.iter().map(|chunk| chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["A.", "B.", "C."]);

    let hits = store.search("idx", &probe("B.").await, 10).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|row| row.filename == "doc.txt"));

    let deleted = pipeline.process_delete("idx", "doc.txt").await.unwrap();
    assert_eq!(deleted.deleted_rows, 3);
    assert!(store.search("idx", &probe("B.").await, 10).await.unwrap().is_empty());

    let events = sink.events().await;
    assert_eq!(
        events,
        vec![
            StatusEvent::Report("idx".into(), "doc.txt".into(), DocumentStatus::Processing),
            StatusEvent::Report("idx".into(), "doc.txt".into(), DocumentStatus::Processed),
            StatusEvent::Clear("idx".into(), "doc.txt".into()),
        ]
    );

    let metrics = pipeline.metrics_snapshot();
    assert_eq!(metrics.documents_processed, 1);
    assert_eq!(metrics.chunks_stored, 3);
    assert_eq!(metrics.documents_deleted, 1);
}

#[tokio::test]
async fn unsupported_format_fails_without_rows() {
    let objects = StubObjects::default().with("idx", "tool.exe", "MZ binary");
    let Fixture {
        pipeline,
        store,
        sink,
    } = fixture(objects, 100, RecordingSink::default());

    let error = pipeline.process_upload("idx", "tool.exe").await.unwrap_err();
    assert!(matches!(
        error,
        PipelineError::Extract(ExtractError::UnsupportedFormat(ref ext)) if ext == ".exe"
    ));
    assert!(store.document_chunks("idx", "tool.exe").await.unwrap().is_empty());

    let events = sink.events().await;
    assert_eq!(
        events.last(),
        Some(&StatusEvent::Report(
            "idx".into(),
            "tool.exe".into(),
            DocumentStatus::Failed("Unsupported file type: .exe".into())
        ))
    );
    assert_eq!(pipeline.metrics_snapshot().documents_failed, 1);
}

#[tokio::test]
async fn reprocessing_unchanged_document_is_idempotent() {
    let body = "Leave is accrued monthly. Requests go to your manager! Is carry-over allowed? Yes, up to five days.";
    let objects = StubObjects::default().with("handbook", "leave.md", body);
    let Fixture {
        pipeline, store, ..
    } = fixture(objects, 8, RecordingSink::default());

    pipeline.process_upload("handbook", "leave.md").await.unwrap();
    let first = store.document_chunks("handbook", "leave.md").await.unwrap();
    pipeline.process_upload("handbook", "leave.md").await.unwrap();
    let second = store.document_chunks("handbook", "leave.md").await.unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    let hits = store.search("handbook", &probe(body).await, 100).await.unwrap();
    assert_eq!(hits.len(), first.len());
}

#[tokio::test]
async fn missing_object_fails_and_keeps_previous_chunks() {
    let objects = StubObjects::default().with("idx", "a.txt", "First. Second.");
    let Fixture {
        pipeline, store, ..
    } = fixture(objects, 100, RecordingSink::default());
    pipeline.process_upload("idx", "a.txt").await.unwrap();

    let error = pipeline.process_upload("idx", "b.txt").await.unwrap_err();
    assert!(matches!(error, PipelineError::Fetch(ObjectStorageError::NotFound { .. })));
    assert_eq!(store.document_chunks("idx", "a.txt").await.unwrap().len(), 1);
}

#[tokio::test]
async fn status_sink_failures_do_not_fail_the_document() {
    let objects = StubObjects::default().with("idx", "a.txt", "Only sentence.");
    let sink = RecordingSink {
        fail: true,
        ..RecordingSink::default()
    };
    let Fixture {
        pipeline, store, ..
    } = fixture(objects, 100, sink);

    let outcome = pipeline.process_upload("idx", "a.txt").await.unwrap();
    assert_eq!(outcome.chunk_count, 1);
    pipeline.process_delete("idx", "a.txt").await.unwrap();
    assert!(store.document_chunks("idx", "a.txt").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_unknown_document_is_a_no_op() {
    let Fixture { pipeline, .. } =
        fixture(StubObjects::default(), 100, RecordingSink::default());
    let outcome = pipeline.process_delete("idx", "never.txt").await.unwrap();
    assert_eq!(outcome.deleted_rows, 0);
}
