//! Frequency-domain summary statistics
//!
//! Centroid, bandwidth and rolloff are computed on the magnitude spectrum,
//! flatness on the power spectrum. Spectral contrast splits the spectrum
//! into octave bands starting at 200 Hz and compares the loudest and
//! quietest 2% of bins in each band.

use super::stft::bin_frequencies;
use crate::models::CONTRAST_DIM;

/// Fraction of magnitude energy below the rolloff frequency
const ROLLOFF_PERCENT: f64 = 0.85;

/// Power floor for flatness and dB conversion
const AMIN: f64 = 1e-10;

/// Lower edge of the first contrast octave
const CONTRAST_FMIN: f64 = 200.0;

/// Fraction of band bins averaged for peak and valley
const CONTRAST_QUANTILE: f64 = 0.02;

/// Dynamic range kept when converting contrast peaks and valleys to dB
const TOP_DB: f64 = 80.0;

/// Time-averaged spectral statistics
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSummary {
    pub centroid: f64,
    pub bandwidth: f64,
    pub rolloff: f64,
    pub flatness: f64,
    pub contrast: [f64; CONTRAST_DIM],
}

/// Centroid of one magnitude frame; 0 for a frame with no energy
fn frame_centroid(magnitude: &[f64], freqs: &[f64]) -> f64 {
    let total: f64 = magnitude.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    magnitude.iter().zip(freqs).map(|(m, f)| m * f).sum::<f64>() / total
}

/// Second-order bandwidth around `centroid`
fn frame_bandwidth(magnitude: &[f64], freqs: &[f64], centroid: f64) -> f64 {
    let total: f64 = magnitude.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let spread: f64 = magnitude
        .iter()
        .zip(freqs)
        .map(|(m, f)| m * (f - centroid).powi(2))
        .sum();
    (spread / total).sqrt()
}

/// Lowest bin frequency at which the cumulative magnitude reaches 85%
fn frame_rolloff(magnitude: &[f64], freqs: &[f64]) -> f64 {
    let threshold = ROLLOFF_PERCENT * magnitude.iter().sum::<f64>();
    let mut cumulative = 0.0;
    for (m, &f) in magnitude.iter().zip(freqs) {
        cumulative += m;
        if cumulative >= threshold {
            return f;
        }
    }
    freqs.last().copied().unwrap_or(0.0)
}

/// Geometric over arithmetic mean of the floored power spectrum
fn frame_flatness(magnitude: &[f64]) -> f64 {
    if magnitude.is_empty() {
        return 0.0;
    }
    let n = magnitude.len() as f64;
    let (log_sum, sum) = magnitude.iter().fold((0.0, 0.0), |(log_sum, sum), m| {
        let power = (m * m).max(AMIN);
        (log_sum + power.ln(), sum + power)
    });
    (log_sum / n).exp() / (sum / n)
}

/// Bin index ranges for each contrast band
///
/// Every band after the first borrows one bin below its lower edge; the top
/// band extends to Nyquist. Bands above Nyquist are empty.
fn contrast_bands(freqs: &[f64]) -> Vec<std::ops::Range<usize>> {
    let n_bands = CONTRAST_DIM - 1;
    let mut edges = vec![0.0];
    edges.extend((0..=n_bands).map(|i| CONTRAST_FMIN * 2f64.powi(i as i32)));

    (0..CONTRAST_DIM)
        .map(|k| {
            let (low, high) = (edges[k], edges[k + 1]);
            let inside: Vec<usize> = freqs
                .iter()
                .enumerate()
                .filter(|(_, &f)| f >= low && f <= high)
                .map(|(i, _)| i)
                .collect();

            let (Some(&first), Some(&last)) = (inside.first(), inside.last()) else {
                return 0..0;
            };

            let start = if k > 0 { first.saturating_sub(1) } else { first };
            let end = if k == n_bands { freqs.len() } else { last + 1 };
            // Interior bands drop their topmost bin
            let end = if k < n_bands { end - 1 } else { end };
            start..end.max(start)
        })
        .collect()
}

/// Mean of the lowest and highest `quantile` share of a band
fn peak_and_valley(band: &[f64]) -> (f64, f64) {
    if band.is_empty() {
        return (0.0, 0.0);
    }
    let mut sorted = band.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let count = ((CONTRAST_QUANTILE * (band.len() + 1) as f64).round() as usize)
        .max(1)
        .min(sorted.len());

    let valley = sorted[..count].iter().sum::<f64>() / count as f64;
    let peak = sorted[sorted.len() - count..].iter().sum::<f64>() / count as f64;
    (peak, valley)
}

fn to_db(values: &mut [f64]) {
    for value in values.iter_mut() {
        *value = 10.0 * value.max(AMIN).log10();
    }
    let max_db = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    for value in values.iter_mut() {
        *value = value.max(max_db - TOP_DB);
    }
}

/// Streaming spectral statistics
///
/// Centroid, bandwidth, rolloff and flatness are running sums. Contrast
/// converts to dB against the loudest band over the whole signal, so each
/// frame's band peaks and valleys are kept until `finish`.
#[derive(Debug, Clone)]
pub struct SpectralAccumulator {
    freqs: Vec<f64>,
    bands: Vec<std::ops::Range<usize>>,
    centroid: f64,
    bandwidth: f64,
    rolloff: f64,
    flatness: f64,
    peaks: Vec<[f64; CONTRAST_DIM]>,
    valleys: Vec<[f64; CONTRAST_DIM]>,
}

impl SpectralAccumulator {
    pub fn new(sample_rate: u32) -> Self {
        let freqs = bin_frequencies(sample_rate);
        let bands = contrast_bands(&freqs);
        Self {
            freqs,
            bands,
            centroid: 0.0,
            bandwidth: 0.0,
            rolloff: 0.0,
            flatness: 0.0,
            peaks: Vec::new(),
            valleys: Vec::new(),
        }
    }

    /// Add one magnitude frame
    pub fn push(&mut self, magnitude: &[f64]) {
        let c = frame_centroid(magnitude, &self.freqs);
        self.centroid += c;
        self.bandwidth += frame_bandwidth(magnitude, &self.freqs, c);
        self.rolloff += frame_rolloff(magnitude, &self.freqs);
        self.flatness += frame_flatness(magnitude);

        let mut peaks = [0.0; CONTRAST_DIM];
        let mut valleys = [0.0; CONTRAST_DIM];
        for (k, band) in self.bands.iter().enumerate() {
            (peaks[k], valleys[k]) = peak_and_valley(&magnitude[band.clone()]);
        }
        self.peaks.push(peaks);
        self.valleys.push(valleys);
    }

    /// Bytes held per pushed frame
    pub fn retained_bytes(&self) -> usize {
        (self.peaks.len() + self.valleys.len()) * std::mem::size_of::<[f64; CONTRAST_DIM]>()
    }

    pub fn finish(self) -> SpectralSummary {
        let num_frames = self.peaks.len();

        let mut peaks: Vec<f64> = self.peaks.into_iter().flatten().collect();
        let mut valleys: Vec<f64> = self.valleys.into_iter().flatten().collect();
        to_db(&mut peaks);
        to_db(&mut valleys);

        let mut contrast = [0.0; CONTRAST_DIM];
        for (i, (peak, valley)) in peaks.iter().zip(&valleys).enumerate() {
            let band = i % CONTRAST_DIM;
            if !self.bands[band].is_empty() {
                contrast[band] += peak - valley;
            }
        }

        let frames = num_frames.max(1) as f64;
        for value in &mut contrast {
            *value /= frames;
        }

        SpectralSummary {
            centroid: self.centroid / frames,
            bandwidth: self.bandwidth / frames,
            rolloff: self.rolloff / frames,
            flatness: self.flatness / frames,
            contrast,
        }
    }
}
