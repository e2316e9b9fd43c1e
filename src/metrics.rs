use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    documents_deleted: AtomicU64,
    chunks_stored: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successfully processed document and the number of chunks stored for it.
    pub fn record_processed(&self, chunk_count: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_stored.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a document whose pipeline run failed.
    pub fn record_failed(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a processed delete event.
    pub fn record_deleted(&self) {
        self.documents_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            documents_deleted: self.documents_deleted.load(Ordering::Relaxed),
            chunks_stored: self.chunks_stored.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents processed successfully since startup.
    pub documents_processed: u64,
    /// Documents whose processing failed since startup.
    pub documents_failed: u64,
    /// Delete events handled since startup.
    pub documents_deleted: u64,
    /// Total chunk rows written across all processed documents.
    pub chunks_stored: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_chunks() {
        let metrics = PipelineMetrics::new();
        metrics.record_processed(2);
        metrics.record_processed(3);
        metrics.record_failed();
        metrics.record_deleted();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_processed, 2);
        assert_eq!(snapshot.chunks_stored, 5);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.documents_deleted, 1);
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = PipelineMetrics::new().snapshot();
        assert_eq!(snapshot.documents_processed, 0);
        assert_eq!(snapshot.chunks_stored, 0);
    }
}
