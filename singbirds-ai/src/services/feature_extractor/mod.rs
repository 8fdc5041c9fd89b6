//! Acoustic feature extraction
//!
//! Turns a trimmed mono waveform into one time-averaged `AcousticFeatures`
//! record. All statistics share one framing (2048-sample frames, 512 hop),
//! so frame-level values line up before averaging.

pub mod chroma;
pub mod mel;
pub mod spectral;
pub mod stft;

use crate::error::AcousticError;
use crate::models::{AcousticFeatures, CHROMA_DIM, MFCC_DIM};
use crate::utils::framing::{frame_rms, frame_zero_crossing_rate};

use chroma::ChromaAccumulator;
use mel::MfccAccumulator;
use spectral::{SpectralAccumulator, SpectralSummary};

/// Every frequency-domain statistic, fed by one STFT pass
struct FrameAccumulators {
    mfcc: MfccAccumulator,
    chroma: ChromaAccumulator,
    spectral: SpectralAccumulator,
}

impl FrameAccumulators {
    fn new(sample_rate: u32) -> Self {
        Self {
            mfcc: MfccAccumulator::new(sample_rate),
            chroma: ChromaAccumulator::new(sample_rate),
            spectral: SpectralAccumulator::new(sample_rate),
        }
    }

    fn push(&mut self, magnitude: &[f64]) {
        self.mfcc.push(magnitude);
        self.chroma.push(magnitude);
        self.spectral.push(magnitude);
    }

    fn retained_bytes(&self) -> usize {
        self.mfcc.retained_bytes() + self.spectral.retained_bytes()
    }

    fn finish(self) -> ([f64; MFCC_DIM], [f64; CHROMA_DIM], SpectralSummary) {
        (self.mfcc.finish(), self.chroma.finish(), self.spectral.finish())
    }
}

/// Stateless feature extractor
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract time-averaged features from a mono waveform
    ///
    /// # Errors
    /// `AcousticError::Decode` when the waveform is empty or the sample rate
    /// is zero. Non-finite intermediate values are coerced to 0 rather than
    /// reported.
    pub fn extract(&self, samples: &[f32], sample_rate: u32) -> Result<AcousticFeatures, AcousticError> {
        if samples.is_empty() {
            return Err(AcousticError::Decode(
                "No samples left to analyze after trimming".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(AcousticError::Decode("Sample rate is zero".to_string()));
        }

        let mut frames = FrameAccumulators::new(sample_rate);
        stft::for_each_frame(samples, |magnitude| frames.push(magnitude));
        tracing::trace!(
            retained_bytes = frames.retained_bytes(),
            "Spectral frame statistics accumulated"
        );
        let (mfcc, chroma, spectral) = frames.finish();

        let mut features = AcousticFeatures {
            mfcc,
            chroma,
            spectral_bandwidth: spectral.bandwidth,
            spectral_contrast: spectral.contrast,
            spectral_flatness: spectral.flatness,
            rms_energy: mean(&frame_rms(samples)),
            zero_crossing_rate: mean(&frame_zero_crossing_rate(samples)),
            spectral_centroid: spectral.centroid,
            spectral_rolloff: spectral.rolloff,
        };

        if !features.is_finite() {
            tracing::warn!("Non-finite feature values coerced to 0");
            coerce_finite(&mut features);
        }

        Ok(features)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn finite_or_zero(value: &mut f64) {
    if !value.is_finite() {
        *value = 0.0;
    }
}

fn coerce_finite(features: &mut AcousticFeatures) {
    features
        .mfcc
        .iter_mut()
        .chain(features.chroma.iter_mut())
        .chain(features.spectral_contrast.iter_mut())
        .for_each(finite_or_zero);

    for scalar in [
        &mut features.spectral_bandwidth,
        &mut features.spectral_flatness,
        &mut features.rms_energy,
        &mut features.zero_crossing_rate,
        &mut features.spectral_centroid,
        &mut features.spectral_rolloff,
    ] {
        finite_or_zero(scalar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CONTRAST_DIM;
    use crate::services::feature_extractor::stft::N_BINS;

    fn chirp(sr: u32, secs: f32) -> Vec<f32> {
        (0..(sr as f32 * secs) as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                0.4 * (2.0 * std::f32::consts::PI * (1500.0 + 2000.0 * t) * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_empty_waveform_is_decode_error() {
        let err = FeatureExtractor::new().extract(&[], 22050).unwrap_err();
        assert!(matches!(err, AcousticError::Decode(_)));
    }

    #[test]
    fn test_zero_sample_rate_is_decode_error() {
        let err = FeatureExtractor::new().extract(&[0.1; 100], 0).unwrap_err();
        assert!(matches!(err, AcousticError::Decode(_)));
    }

    #[test]
    fn test_features_have_fixed_shape_and_are_finite() {
        let features = FeatureExtractor::new().extract(&chirp(22050, 1.5), 22050).unwrap();

        assert_eq!(features.mfcc.len(), MFCC_DIM);
        assert_eq!(features.chroma.len(), CHROMA_DIM);
        assert_eq!(features.spectral_contrast.len(), CONTRAST_DIM);
        assert!(features.is_finite());
        assert!(features.rms_energy > 0.2 && features.rms_energy < 0.35);
        assert!(features.zero_crossing_rate > 0.0);
        assert!(features.spectral_centroid > 1000.0);
    }

    #[test]
    fn test_all_silent_waveform_has_no_nan() {
        let features = FeatureExtractor::new().extract(&vec![0.0; 22050], 22050).unwrap();

        assert!(features.is_finite());
        assert_eq!(features.rms_energy, 0.0);
        assert_eq!(features.zero_crossing_rate, 0.0);
        assert!(features.chroma.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_shorter_than_one_frame() {
        let features = FeatureExtractor::new().extract(&chirp(22050, 0.01), 22050).unwrap();
        assert!(features.is_finite());
    }

    #[test]
    fn test_frame_state_is_bounded_per_frame() {
        let mut frames = FrameAccumulators::new(48000);
        let magnitude: Vec<f64> = (0..N_BINS).map(|k| (k % 17) as f64 * 0.1).collect();
        for _ in 0..200 {
            frames.push(&magnitude);
        }

        // Under 1 KiB per frame, against 8 KiB for a stored f64 spectrogram frame
        let per_frame = frames.retained_bytes() / 200;
        assert!(per_frame < 1024, "retained {} bytes per frame", per_frame);
    }

    #[test]
    fn test_long_recording() {
        // Two minutes at 22.05 kHz, ~5200 frames
        let sr = 22050;
        let samples: Vec<f32> = chirp(sr, 1.5).into_iter().cycle().take(sr as usize * 120).collect();

        let features = FeatureExtractor::new().extract(&samples, sr).unwrap();

        assert!(features.is_finite());
        assert!(features.spectral_centroid > 1000.0);
    }

    #[test]
    fn test_coerce_finite() {
        let mut features = FeatureExtractor::new().extract(&chirp(8000, 0.5), 8000).unwrap();
        features.mfcc[3] = f64::NAN;
        features.spectral_rolloff = f64::INFINITY;

        coerce_finite(&mut features);

        assert_eq!(features.mfcc[3], 0.0);
        assert_eq!(features.spectral_rolloff, 0.0);
        assert!(features.is_finite());
    }
}
