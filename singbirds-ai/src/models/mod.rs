//! Data models for singbirds-ai

pub mod embedding;
pub mod features;
pub mod ingestion;
pub mod recording;

pub use embedding::{EmbeddingStrategy, LabeledVector, ProjectedPoint};
pub use features::{
    AcousticFeatures, PendingFeatureRow, StoredFeatureRow, ASSEMBLED_DIM, CHROMA_DIM,
    CONTRAST_DIM, MFCC_DIM,
};
pub use ingestion::{FailedBatch, FailureKind, IngestionReport, ItemFailure};
pub use recording::{Entity, Recording};
