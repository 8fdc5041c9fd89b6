//! Short-time Fourier transform
//!
//! Magnitude frames on the shared centered framing: `n_fft` 2048, hop 512,
//! periodic Hann window, one-sided spectrum of `n_fft/2 + 1` bins. Frames
//! are streamed to a callback one at a time; no spectrogram is retained.

use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;

use crate::utils::framing::{fill_frame, frame_count, Padding, FRAME_LENGTH};

/// FFT size; equal to the time-domain frame length
pub const N_FFT: usize = FRAME_LENGTH;

/// Number of one-sided frequency bins
pub const N_BINS: usize = N_FFT / 2 + 1;

/// Center frequency of each bin in Hz
pub fn bin_frequencies(sample_rate: u32) -> Vec<f64> {
    let sr = sample_rate as f64;
    (0..N_BINS).map(|k| k as f64 * sr / N_FFT as f64).collect()
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / size as f64).cos()))
        .collect()
}

/// Run the STFT over a mono signal, handing each `|X|` frame to `on_frame`
///
/// Always yields at least one frame; an empty input produces one frame of
/// zeros. The slice passed to `on_frame` is reused between calls. Returns
/// the number of frames produced.
pub fn for_each_frame<F>(samples: &[f32], mut on_frame: F) -> usize
where
    F: FnMut(&[f64]),
{
    let num_frames = frame_count(samples.len());
    let window = hann_window(N_FFT);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let mut frame = vec![0.0f32; N_FFT];
    let mut buffer = vec![Complex::new(0.0f64, 0.0); N_FFT];
    let mut magnitude = vec![0.0f64; N_BINS];

    for frame_idx in 0..num_frames {
        fill_frame(samples, frame_idx, Padding::Zero, &mut frame);
        for ((slot, &sample), &win) in buffer.iter_mut().zip(&frame).zip(&window) {
            *slot = Complex::new(sample as f64 * win, 0.0);
        }

        fft.process(&mut buffer);

        for (m, c) in magnitude.iter_mut().zip(&buffer[..N_BINS]) {
            *m = c.norm();
        }
        on_frame(&magnitude);
    }

    tracing::trace!(
        samples = samples.len(),
        frames = num_frames,
        n_fft = N_FFT,
        "STFT computed"
    );

    num_frames
}
