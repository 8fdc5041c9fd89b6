//! Batch ingestion scheduler
//!
//! Fans a worklist of recordings out to at most `concurrency` concurrent
//! download → decode → trim → extract jobs and fans successful rows back
//! into a shared `BatchBuffer`. The job whose push fills the buffer takes
//! the full batch while holding the lock and writes it after releasing the
//! lock, so each threshold crossing produces exactly one bulk write.
//! Per-recording failures are collected and never stop sibling jobs.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AcousticError;
use crate::models::{
    FailedBatch, FailureKind, IngestionReport, ItemFailure, PendingFeatureRow, Recording,
};
use crate::services::feature_extractor::FeatureExtractor;
use crate::services::recording_fetcher::RecordingFetcher;
use crate::services::silence_trimmer::SilenceTrimmer;
use crate::utils::audio_decoder::decode_audio_bytes;

/// Default number of concurrent jobs
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default rows per bulk write
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Destination for extracted feature rows
#[async_trait::async_trait]
pub trait FeatureStore: Send + Sync {
    /// Write all rows atomically; either every row is stored or none is
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    /// `AcousticError::Persistence` when the write is rejected, including a
    /// second row for a recording that already has one.
    async fn insert_batch(&self, rows: &[PendingFeatureRow]) -> Result<usize, AcousticError>;
}

/// Fixed-capacity accumulator for pending rows
#[derive(Debug)]
pub struct BatchBuffer {
    capacity: usize,
    rows: Vec<PendingFeatureRow>,
}

impl BatchBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Append a row; returns the full batch when this push reached capacity
    pub fn push(&mut self, row: PendingFeatureRow) -> Option<Vec<PendingFeatureRow>> {
        self.rows.push(row);
        if self.rows.len() >= self.capacity {
            Some(std::mem::replace(
                &mut self.rows,
                Vec::with_capacity(self.capacity),
            ))
        } else {
            None
        }
    }

    /// Take whatever is left; `None` when empty
    pub fn take_remainder(&mut self) -> Option<Vec<PendingFeatureRow>> {
        if self.rows.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.rows))
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of one bulk write
enum FlushOutcome {
    Written(usize),
    Rejected(FailedBatch),
}

/// Outcome of one worklist item
enum JobOutcome {
    Extracted(Option<FlushOutcome>),
    Failed(ItemFailure),
}

/// Download, decode, trim and extract one recording
///
/// Decoding and extraction run on the blocking thread pool.
pub async fn analyze_recording(
    recording: &Recording,
    fetcher: &dyn RecordingFetcher,
    trimmer: &SilenceTrimmer,
    extractor: &FeatureExtractor,
) -> Result<PendingFeatureRow, AcousticError> {
    let bytes = fetcher.fetch(recording).await?;

    let extension = recording.url_extension().map(str::to_owned);
    let trimmer = trimmer.clone();
    let extractor = extractor.clone();
    let recording_id = recording.recording_id.clone();

    let features = tokio::task::spawn_blocking(move || {
        let decoded = decode_audio_bytes(bytes, extension.as_deref())
            .map_err(|e| AcousticError::Decode(format!("{:#}", e)))?;

        let trimmed = trimmer.trim(&decoded.samples, decoded.sample_rate);
        if trimmed.fell_back {
            tracing::debug!(
                recording_id = %recording_id,
                "Recording entirely below silence threshold, analyzing untrimmed signal"
            );
        }

        extractor.extract(&trimmed.samples, decoded.sample_rate)
    })
    .await
    .map_err(|e| AcousticError::Extraction(format!("Extraction task failed: {}", e)))??;

    Ok(PendingFeatureRow::new(
        recording.recording_id.clone(),
        recording.entity_id.clone(),
        features,
    ))
}

/// Concurrent ingestion with batched persistence
pub struct IngestionScheduler {
    concurrency: usize,
    batch_size: usize,
    trimmer: SilenceTrimmer,
    extractor: FeatureExtractor,
    fetcher: Arc<dyn RecordingFetcher>,
    store: Arc<dyn FeatureStore>,
}

impl IngestionScheduler {
    /// Create scheduler with default concurrency (4) and batch size (10)
    pub fn new(fetcher: Arc<dyn RecordingFetcher>, store: Arc<dyn FeatureStore>) -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            trimmer: SilenceTrimmer::new(),
            extractor: FeatureExtractor::new(),
            fetcher,
            store,
        }
    }

    /// Set maximum concurrent jobs (must be >= 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, AcousticError> {
        if concurrency == 0 {
            return Err(AcousticError::InvalidInput(
                "concurrency must be >= 1".to_string(),
            ));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Set rows per bulk write (must be >= 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, AcousticError> {
        if batch_size == 0 {
            return Err(AcousticError::InvalidInput(
                "batch_size must be >= 1".to_string(),
            ));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_trimmer(mut self, trimmer: SilenceTrimmer) -> Self {
        self.trimmer = trimmer;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Process every distinct recording in the worklist exactly once
    ///
    /// Always returns a report; failures are recorded in it rather than
    /// returned as errors.
    pub async fn run(&self, worklist: Vec<Recording>) -> IngestionReport {
        let mut seen = HashSet::new();
        let worklist: Vec<Recording> = worklist
            .into_iter()
            .filter(|r| seen.insert(r.recording_id.clone()))
            .collect();
        let total = worklist.len();

        tracing::info!(
            recordings = total,
            concurrency = self.concurrency,
            batch_size = self.batch_size,
            "Starting ingestion run"
        );

        let buffer = Mutex::new(BatchBuffer::new(self.batch_size));
        let completed = AtomicUsize::new(0);

        let outcomes: Vec<JobOutcome> = stream::iter(worklist)
            .map(|recording| {
                let buffer = &buffer;
                let completed = &completed;

                async move {
                    let outcome = self.process_one(recording, buffer).await;

                    let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if current % 10 == 0 || current == total {
                        tracing::info!(
                            progress = format!("{}/{}", current, total),
                            "Ingestion progress"
                        );
                    }
                    outcome
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = IngestionReport {
            attempted: total,
            ..Default::default()
        };

        for outcome in outcomes {
            match outcome {
                JobOutcome::Extracted(flush) => {
                    report.succeeded += 1;
                    if let Some(flush) = flush {
                        Self::record_flush(&mut report, flush);
                    }
                }
                JobOutcome::Failed(failure) => report.failures.push(failure),
            }
        }

        let remainder = buffer.lock().await.take_remainder();
        if let Some(rows) = remainder {
            let flush = self.flush(rows).await;
            Self::record_flush(&mut report, flush);
        }

        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failures.len(),
            batches_written = report.batches_written,
            rows_written = report.rows_written,
            failed_batches = report.failed_batches.len(),
            "Ingestion run complete"
        );

        report
    }

    async fn process_one(&self, recording: Recording, buffer: &Mutex<BatchBuffer>) -> JobOutcome {
        let result = analyze_recording(
            &recording,
            self.fetcher.as_ref(),
            &self.trimmer,
            &self.extractor,
        )
        .await;

        match result {
            Ok(row) => {
                tracing::debug!(recording_id = %recording.recording_id, "Features extracted");

                // Lock scope ends before the write
                let full_batch = buffer.lock().await.push(row);
                match full_batch {
                    Some(rows) => JobOutcome::Extracted(Some(self.flush(rows).await)),
                    None => JobOutcome::Extracted(None),
                }
            }
            Err(e) => {
                tracing::warn!(
                    recording_id = %recording.recording_id,
                    url = %recording.recording_url,
                    error = %e,
                    "Recording failed"
                );
                JobOutcome::Failed(ItemFailure {
                    kind: FailureKind::from_error(&e),
                    recording_id: recording.recording_id,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn flush(&self, rows: Vec<PendingFeatureRow>) -> FlushOutcome {
        match self.store.insert_batch(&rows).await {
            Ok(written) => {
                tracing::info!(rows = written, "Feature batch written");
                FlushOutcome::Written(written)
            }
            Err(e) => {
                tracing::error!(rows = rows.len(), error = %e, "Feature batch rejected");
                FlushOutcome::Rejected(FailedBatch {
                    recording_ids: rows.into_iter().map(|r| r.recording_id).collect(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn record_flush(report: &mut IngestionReport, flush: FlushOutcome) {
        match flush {
            FlushOutcome::Written(rows) => {
                report.batches_written += 1;
                report.rows_written += rows;
            }
            FlushOutcome::Rejected(batch) => report.failed_batches.push(batch),
        }
    }
}
