//! Mel filterbank and MFCCs
//!
//! Slaney-scale, area-normalized triangular filters over 0 Hz to Nyquist,
//! log power in dB with an 80 dB dynamic-range floor, orthonormal DCT-II.

use std::f64::consts::PI;

use super::stft::{N_BINS, N_FFT};
use crate::models::MFCC_DIM;

/// Number of mel bands feeding the DCT
pub const N_MELS: usize = 128;

/// Dynamic range kept below the loudest mel value
const TOP_DB: f64 = 80.0;

/// Power floor before taking logs
const AMIN: f64 = 1e-10;

// Slaney mel scale: linear below 1 kHz, logarithmic above
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// One triangular filter, stored as its non-zero span
#[derive(Debug, Clone)]
struct MelFilter {
    first_bin: usize,
    weights: Vec<f64>,
}

/// Triangular mel filterbank for a given sample rate
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<MelFilter>,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32) -> Self {
        let fmax = sample_rate as f64 / 2.0;
        let mel_max = hz_to_mel(fmax);

        let edges_hz: Vec<f64> = (0..N_MELS + 2)
            .map(|i| mel_to_hz(mel_max * i as f64 / (N_MELS + 1) as f64))
            .collect();
        let bin_hz: Vec<f64> = (0..N_BINS)
            .map(|k| k as f64 * sample_rate as f64 / N_FFT as f64)
            .collect();

        let filters = (0..N_MELS)
            .map(|m| {
                let (lower, center, upper) = (edges_hz[m], edges_hz[m + 1], edges_hz[m + 2]);
                let enorm = 2.0 / (upper - lower);

                let mut first_bin = None;
                let mut weights = Vec::new();
                for (k, &f) in bin_hz.iter().enumerate() {
                    let rising = (f - lower) / (center - lower);
                    let falling = (upper - f) / (upper - center);
                    let w = rising.min(falling).max(0.0) * enorm;
                    if w > 0.0 {
                        first_bin.get_or_insert(k);
                        weights.push(w);
                    } else if first_bin.is_some() {
                        break;
                    }
                }

                MelFilter {
                    first_bin: first_bin.unwrap_or(0),
                    weights,
                }
            })
            .collect();

        Self { filters }
    }

    /// Apply filterbank to one power frame
    pub fn apply(&self, power: &[f64]) -> Vec<f64> {
        self.filters
            .iter()
            .map(|filter| {
                filter
                    .weights
                    .iter()
                    .zip(&power[filter.first_bin..])
                    .map(|(w, p)| w * p)
                    .sum()
            })
            .collect()
    }
}

/// Orthonormal DCT-II of `input`, first `n_out` coefficients
fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..n_out)
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos())
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}

/// Streaming time-averaged MFCCs
///
/// The 80 dB floor is relative to the loudest mel value of the whole
/// signal, so per-frame log-mel bands are kept (as `f32`) until `finish`.
/// The DCT is linear, so it runs once on the band means.
#[derive(Debug, Clone)]
pub struct MfccAccumulator {
    filterbank: MelFilterbank,
    log_mel: Vec<[f32; N_MELS]>,
    max_db: f64,
    power: Vec<f64>,
}

impl MfccAccumulator {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            filterbank: MelFilterbank::new(sample_rate),
            log_mel: Vec::new(),
            max_db: f64::NEG_INFINITY,
            power: vec![0.0; N_BINS],
        }
    }

    /// Add one magnitude frame
    pub fn push(&mut self, magnitude: &[f64]) {
        for (p, m) in self.power.iter_mut().zip(magnitude) {
            *p = m * m;
        }

        let mut bands = [0.0f32; N_MELS];
        for (slot, energy) in bands.iter_mut().zip(self.filterbank.apply(&self.power)) {
            let db = 10.0 * energy.max(AMIN).log10();
            self.max_db = self.max_db.max(db);
            *slot = db as f32;
        }
        self.log_mel.push(bands);
    }

    /// Bytes held per pushed frame
    pub fn retained_bytes(&self) -> usize {
        self.log_mel.len() * std::mem::size_of::<[f32; N_MELS]>()
    }

    pub fn finish(self) -> [f64; MFCC_DIM] {
        let floor = self.max_db - TOP_DB;
        let frames = self.log_mel.len().max(1) as f64;

        let mut band_means = vec![0.0f64; N_MELS];
        for frame in &self.log_mel {
            for (acc, &db) in band_means.iter_mut().zip(frame) {
                *acc += (db as f64).max(floor);
            }
        }
        for value in &mut band_means {
            *value /= frames;
        }

        let mut mfcc = [0.0; MFCC_DIM];
        if !self.log_mel.is_empty() {
            mfcc.copy_from_slice(&dct_ortho(&band_means, MFCC_DIM));
        }
        mfcc
    }
}
