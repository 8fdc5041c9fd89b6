//! Silence trimming ahead of feature extraction
//!
//! Frames whose RMS falls more than `threshold_db` below the loudest frame
//! are dropped; the remaining non-silent intervals are concatenated in
//! order. A recording with nothing above the threshold is returned as-is.

use thiserror::Error;

use crate::error::AcousticError;
use crate::utils::framing::{frame_rms, HOP_LENGTH};

/// Default threshold below peak, in dB
pub const DEFAULT_THRESHOLD_DB: f64 = 30.0;

/// Silence trimming errors
#[derive(Debug, Error)]
pub enum TrimError {
    /// Threshold must be a positive number of dB below peak
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}

impl From<TrimError> for AcousticError {
    fn from(err: TrimError) -> Self {
        AcousticError::InvalidInput(err.to_string())
    }
}

/// Half-open sample range `[start, end)` kept by the trimmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleInterval {
    pub start: usize,
    pub end: usize,
}

impl SampleInterval {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Result of trimming one waveform
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    /// Concatenated non-silent samples (or the original signal on fallback)
    pub samples: Vec<f32>,
    /// Intervals of the original signal that were kept
    pub intervals: Vec<SampleInterval>,
    /// True when no frame cleared the threshold and the input was returned unchanged
    pub fell_back: bool,
}

impl TrimOutcome {
    /// Number of samples removed
    pub fn removed(&self, original_len: usize) -> usize {
        original_len.saturating_sub(self.samples.len())
    }
}

/// Energy-threshold silence trimmer
#[derive(Debug, Clone)]
pub struct SilenceTrimmer {
    /// Threshold in dB below the loudest frame (positive)
    threshold_db: f64,
}

impl SilenceTrimmer {
    /// Create trimmer with the default 30 dB threshold
    pub fn new() -> Self {
        Self {
            threshold_db: DEFAULT_THRESHOLD_DB,
        }
    }

    /// Set threshold in dB below peak
    pub fn with_threshold_db(mut self, threshold_db: f64) -> Result<Self, TrimError> {
        if !threshold_db.is_finite() || threshold_db <= 0.0 {
            return Err(TrimError::InvalidThreshold(format!(
                "Threshold must be a positive dB value below peak, got {}",
                threshold_db
            )));
        }
        self.threshold_db = threshold_db;
        Ok(self)
    }

    pub fn threshold_db(&self) -> f64 {
        self.threshold_db
    }

    /// Locate non-silent intervals in sample coordinates
    ///
    /// Returns an empty list when the signal is digital silence or no frame
    /// clears the threshold.
    pub fn non_silent_intervals(&self, samples: &[f32]) -> Vec<SampleInterval> {
        if samples.is_empty() {
            return Vec::new();
        }

        let rms = frame_rms(samples);
        let peak = rms.iter().cloned().fold(0.0f64, f64::max);
        if peak <= 0.0 {
            return Vec::new();
        }

        let threshold_linear = peak * Self::db_to_linear(-self.threshold_db);

        let mut intervals = Vec::new();
        let mut run_start: Option<usize> = None;

        for (frame_idx, &value) in rms.iter().enumerate() {
            let loud = value > threshold_linear;
            match (loud, run_start) {
                (true, None) => run_start = Some(frame_idx),
                (false, Some(start)) => {
                    intervals.push(Self::frames_to_samples(start, frame_idx, samples.len()));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            intervals.push(Self::frames_to_samples(start, rms.len(), samples.len()));
        }

        intervals.retain(|interval| !interval.is_empty());
        intervals
    }

    /// Remove silent segments
    ///
    /// The sample rate is unchanged by trimming; it is accepted so callers
    /// can log durations consistently.
    pub fn trim(&self, samples: &[f32], sample_rate: u32) -> TrimOutcome {
        let intervals = self.non_silent_intervals(samples);

        if intervals.is_empty() {
            tracing::debug!(
                samples = samples.len(),
                "No frame above silence threshold, keeping original signal"
            );
            return TrimOutcome {
                samples: samples.to_vec(),
                intervals: Vec::new(),
                fell_back: true,
            };
        }

        let kept: usize = intervals.iter().map(SampleInterval::len).sum();
        let mut trimmed = Vec::with_capacity(kept);
        for interval in &intervals {
            trimmed.extend_from_slice(&samples[interval.start..interval.end]);
        }

        if sample_rate > 0 {
            tracing::debug!(
                intervals = intervals.len(),
                kept_seconds = format!("{:.2}", kept as f64 / sample_rate as f64),
                removed_seconds = format!(
                    "{:.2}",
                    (samples.len() - kept) as f64 / sample_rate as f64
                ),
                "Silence trimmed"
            );
        }

        TrimOutcome {
            samples: trimmed,
            intervals,
            fell_back: false,
        }
    }

    /// Convert frame range `[start, end)` to a clamped sample range
    fn frames_to_samples(start_frame: usize, end_frame: usize, len: usize) -> SampleInterval {
        SampleInterval {
            start: (start_frame * HOP_LENGTH).min(len),
            end: (end_frame * HOP_LENGTH).min(len),
        }
    }

    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }
}

impl Default for SilenceTrimmer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 22050.0).sin())
            .collect()
    }

    #[test]
    fn test_trimmer_creation() {
        let trimmer = SilenceTrimmer::new();
        assert_eq!(trimmer.threshold_db(), 30.0);
    }

    #[test]
    fn test_invalid_threshold() {
        assert!(SilenceTrimmer::new().with_threshold_db(0.0).is_err());
        assert!(SilenceTrimmer::new().with_threshold_db(-20.0).is_err());
        assert!(SilenceTrimmer::new().with_threshold_db(f64::NAN).is_err());
        assert!(SilenceTrimmer::new().with_threshold_db(60.0).is_ok());
    }

    #[test]
    fn test_db_conversion() {
        let linear = SilenceTrimmer::db_to_linear(-60.0);
        assert!((linear - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_signal_falls_back() {
        let samples = vec![0.0f32; 22050];
        let outcome = SilenceTrimmer::new().trim(&samples, 22050);

        assert!(outcome.fell_back);
        assert_eq!(outcome.samples.len(), samples.len());
        assert!(outcome.intervals.is_empty());
    }

    #[test]
    fn test_empty_signal_falls_back_to_empty() {
        let outcome = SilenceTrimmer::new().trim(&[], 22050);
        assert!(outcome.fell_back);
        assert!(outcome.samples.is_empty());
    }

    #[test]
    fn test_constant_signal_is_kept_whole() {
        let samples = tone(22050, 0.5);
        let outcome = SilenceTrimmer::new().trim(&samples, 22050);

        assert!(!outcome.fell_back);
        assert_eq!(outcome.samples.len(), samples.len());
        assert_eq!(outcome.removed(samples.len()), 0);
    }

    #[test]
    fn test_silent_gap_is_removed() {
        // 1s tone, 2s silence, 1s tone
        let mut samples = tone(22050, 0.5);
        samples.extend(vec![0.0f32; 44100]);
        samples.extend(tone(22050, 0.5));

        let outcome = SilenceTrimmer::new().trim(&samples, 22050);

        assert!(!outcome.fell_back);
        assert_eq!(outcome.intervals.len(), 2);
        assert!(outcome.removed(samples.len()) > 40000);
        // Intervals are ordered and disjoint
        assert!(outcome.intervals[0].end <= outcome.intervals[1].start);
        assert_eq!(outcome.intervals[1].end, samples.len());
    }

    #[test]
    fn test_leading_quiet_section_trimmed() {
        // Quiet noise floor 60 dB below the tone
        let mut samples = tone(44100, 0.0005);
        samples.extend(tone(44100, 0.5));

        let outcome = SilenceTrimmer::new().trim(&samples, 22050);

        assert_eq!(outcome.intervals.len(), 1);
        assert!(outcome.intervals[0].start > 40000);
        assert_eq!(outcome.intervals[0].end, samples.len());
    }
}
