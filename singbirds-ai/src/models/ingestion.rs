//! Ingestion run results

use serde::{Deserialize, Serialize};

use crate::error::AcousticError;

/// Category of a per-recording failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    DownloadError,
    DecodeError,
    ExtractionError,
}

impl FailureKind {
    /// Classify a pipeline error raised while processing one recording
    pub fn from_error(err: &AcousticError) -> Self {
        match err {
            AcousticError::Download(_) => FailureKind::DownloadError,
            AcousticError::Decode(_) => FailureKind::DecodeError,
            _ => FailureKind::ExtractionError,
        }
    }
}

/// One recording that could not be turned into a feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub recording_id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// A bulk write the store rejected; none of its rows were written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedBatch {
    pub recording_ids: Vec<String>,
    pub message: String,
}

/// Summary returned by every ingestion run, successful or not
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestionReport {
    /// Distinct recordings attempted
    pub attempted: usize,
    /// Recordings whose features were extracted
    pub succeeded: usize,
    /// Bulk writes the store accepted
    pub batches_written: usize,
    /// Rows contained in accepted bulk writes
    pub rows_written: usize,
    pub failures: Vec<ItemFailure>,
    pub failed_batches: Vec<FailedBatch>,
}
