//! Operator-facing operations shared by the HTTP API and the CLI

pub mod embedding;
pub mod ingestion;

pub use embedding::{load_labeled_vectors, run_embedding, EmbeddingOutcome, EmbeddingRequest};
pub use ingestion::{run_ingestion, IngestionOutcome, IngestionRequest};
