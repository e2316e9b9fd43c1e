//! Document pipeline: notification parsing, chunking, and ingest orchestration.

pub mod chunking;
pub mod events;
mod pipeline;
pub mod types;

pub use chunking::{Chunk, SentenceChunker, chunk_text};
pub use events::{EventKind, Notification, NotificationParseError, StorageEvent, parse_notification};
pub use pipeline::{DocumentPipeline, DocumentProcessor};
pub use types::{ChunkingError, DeleteOutcome, DocumentStage, PipelineError, UploadOutcome};
