//! Pitch-class (chroma) profile
//!
//! Every bin from C1 upward folds its power into the nearest equal-tempered
//! pitch class (A4 = 440 Hz, C = class 0). Each frame is scaled so its
//! strongest class is 1, then frames are averaged.

use super::stft::bin_frequencies;
use crate::models::CHROMA_DIM;

/// Lowest frequency folded into the profile (C1)
const MIN_FREQUENCY_HZ: f64 = 32.703;

/// Nearest pitch class of a frequency, C = 0
pub fn pitch_class(frequency_hz: f64) -> usize {
    let midi = 69.0 + 12.0 * (frequency_hz / 440.0).log2();
    (midi.round() as i64).rem_euclid(CHROMA_DIM as i64) as usize
}

/// Streaming time-averaged chroma profile
#[derive(Debug, Clone)]
pub struct ChromaAccumulator {
    classes: Vec<Option<usize>>,
    sum: [f64; CHROMA_DIM],
    frames: usize,
}

impl ChromaAccumulator {
    pub fn new(sample_rate: u32) -> Self {
        let classes = bin_frequencies(sample_rate)
            .into_iter()
            .map(|f| (f >= MIN_FREQUENCY_HZ).then(|| pitch_class(f)))
            .collect();
        Self {
            classes,
            sum: [0.0; CHROMA_DIM],
            frames: 0,
        }
    }

    /// Add one magnitude frame
    pub fn push(&mut self, magnitude: &[f64]) {
        self.frames += 1;

        let mut frame = [0.0; CHROMA_DIM];
        for (m, class) in magnitude.iter().zip(&self.classes) {
            if let Some(class) = class {
                frame[*class] += m * m;
            }
        }

        let peak = frame.iter().cloned().fold(0.0, f64::max);
        if peak > 0.0 {
            for (acc, value) in self.sum.iter_mut().zip(frame) {
                *acc += value / peak;
            }
        }
    }

    pub fn finish(self) -> [f64; CHROMA_DIM] {
        let frames = self.frames.max(1) as f64;
        self.sum.map(|v| v / frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::feature_extractor::stft::for_each_frame;

    fn mean_chroma(samples: &[f32], sr: u32) -> [f64; CHROMA_DIM] {
        let mut acc = ChromaAccumulator::new(sr);
        for_each_frame(samples, |m| acc.push(m));
        acc.finish()
    }

    #[test]
    fn test_pitch_classes() {
        assert_eq!(pitch_class(440.0), 9); // A
        assert_eq!(pitch_class(261.63), 0); // C4
        assert_eq!(pitch_class(32.703), 0); // C1
        assert_eq!(pitch_class(466.16), 10); // A#
    }

    #[test]
    fn test_a440_tone_peaks_on_a() {
        let sr = 22050u32;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
            .collect();

        let chroma = mean_chroma(&samples, sr);
        let strongest = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| k)
            .unwrap();

        assert_eq!(strongest, 9);
        assert!(chroma.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_silence_gives_zero_chroma() {
        let chroma = mean_chroma(&vec![0.0f32; 4096], 22050);
        assert!(chroma.iter().all(|&v| v == 0.0));
    }
}
