//! Business logic services

pub mod embedding;
pub mod exporter;
pub mod feature_assembler;
pub mod feature_extractor;
pub mod ingestion_scheduler;
pub mod recording_fetcher;
pub mod silence_trimmer;

pub use embedding::{EmbeddingEngine, GraphProjector, NmdsProjector, Projector};
pub use exporter::{export_document, render_document, ExportError};
pub use feature_assembler::{assemble, assemble_all, AssembledVector, FieldOutcome, ZeroFillReason};
pub use feature_extractor::FeatureExtractor;
pub use ingestion_scheduler::{analyze_recording, BatchBuffer, FeatureStore, IngestionScheduler};
pub use recording_fetcher::{HttpRecordingFetcher, RecordingFetcher};
pub use silence_trimmer::{SilenceTrimmer, TrimError, TrimOutcome};
