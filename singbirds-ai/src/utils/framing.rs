//! Centered time-domain framing shared by the trimmer and the extractor
//!
//! Frame `t` covers samples `[t*hop - frame/2, t*hop + frame/2)` of the
//! original signal; positions outside the signal are filled according to
//! the padding mode. A signal of `n` samples yields `1 + n / hop` frames.

/// Frame length in samples for every framed statistic
pub const FRAME_LENGTH: usize = 2048;

/// Hop between consecutive frames in samples
pub const HOP_LENGTH: usize = 512;

/// How out-of-range positions are filled when framing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Zeros outside the signal
    Zero,
    /// Repeat the first/last sample
    Edge,
}

/// Number of centered frames for a signal of `len` samples
pub fn frame_count(len: usize) -> usize {
    1 + len / HOP_LENGTH
}

/// Sample at a (possibly out-of-range) position of the signal
fn padded_sample(samples: &[f32], pos: isize, padding: Padding) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    if pos >= 0 && (pos as usize) < samples.len() {
        return samples[pos as usize];
    }
    match padding {
        Padding::Zero => 0.0,
        Padding::Edge if pos < 0 => samples[0],
        Padding::Edge => samples[samples.len() - 1],
    }
}

/// Copy frame `index` into `out` (length `FRAME_LENGTH`)
pub fn fill_frame(samples: &[f32], index: usize, padding: Padding, out: &mut [f32]) {
    let start = (index * HOP_LENGTH) as isize - (FRAME_LENGTH / 2) as isize;
    for (offset, slot) in out.iter_mut().enumerate() {
        *slot = padded_sample(samples, start + offset as isize, padding);
    }
}

/// Root-mean-square amplitude per centered frame (zero padding)
pub fn frame_rms(samples: &[f32]) -> Vec<f64> {
    let mut frame = vec![0.0f32; FRAME_LENGTH];
    (0..frame_count(samples.len()))
        .map(|t| {
            fill_frame(samples, t, Padding::Zero, &mut frame);
            let sum_squares: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_squares / FRAME_LENGTH as f64).sqrt()
        })
        .collect()
}

/// Magnitudes at or below this are treated as exact zeros when counting crossings
const ZERO_CROSSING_FLOOR: f32 = 1e-10;

/// Fraction of adjacent sample pairs that change sign, per centered frame (edge padding)
///
/// Zero counts as positive, so a run of digital silence has no crossings.
pub fn frame_zero_crossing_rate(samples: &[f32]) -> Vec<f64> {
    let mut frame = vec![0.0f32; FRAME_LENGTH];
    (0..frame_count(samples.len()))
        .map(|t| {
            fill_frame(samples, t, Padding::Edge, &mut frame);
            let crossings = frame
                .windows(2)
                .filter(|pair| is_non_negative(pair[0]) != is_non_negative(pair[1]))
                .count();
            crossings as f64 / FRAME_LENGTH as f64
        })
        .collect()
}

fn is_non_negative(sample: f32) -> bool {
    sample.abs() <= ZERO_CROSSING_FLOOR || sample >= 0.0
}
