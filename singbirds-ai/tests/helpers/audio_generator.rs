//! In-memory WAV fixtures generated with hound

use std::io::Cursor;

const SAMPLE_RATE: u32 = 22050;

fn write_wav(samples: impl Iterator<Item = f32>) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for s in samples {
            writer.write_sample((s.clamp(-1.0, 1.0) * 16000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Pure tone framed by half a second of silence on each side
pub fn tone_wav(freq: f32, secs: f32) -> Vec<u8> {
    let pad = SAMPLE_RATE as usize / 2;
    let body = (SAMPLE_RATE as f32 * secs) as usize;
    let samples = (0..pad + body + pad).map(move |i| {
        if i < pad || i >= pad + body {
            0.0
        } else {
            (2.0 * std::f32::consts::PI * freq * (i - pad) as f32 / SAMPLE_RATE as f32).sin()
        }
    });
    write_wav(samples)
}

/// Deterministic pseudo-random noise
pub fn noise_wav(secs: f32, seed: u32) -> Vec<u8> {
    let mut state = seed.max(1);
    let samples = (0..(SAMPLE_RATE as f32 * secs) as usize).map(move |_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        (state as f32 / u32::MAX as f32) * 2.0 - 1.0
    });
    write_wav(samples)
}

pub fn silent_wav(secs: f32) -> Vec<u8> {
    write_wav(std::iter::repeat(0.0).take((SAMPLE_RATE as f32 * secs) as usize))
}
