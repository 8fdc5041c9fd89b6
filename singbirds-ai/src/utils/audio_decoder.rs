//! Audio Decoding Utilities
//!
//! Decodes downloaded recording bytes to mono f32 PCM using symphonia
//! (MP3, FLAC, WAV, OGG/Vorbis, AAC, ...).

use anyhow::{anyhow, Context, Result};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono audio samples (f32, range [-1.0, 1.0])
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
    /// Duration in seconds
    pub duration_seconds: f64,
}

/// Decode an in-memory audio file to mono f32 PCM
///
/// Multi-channel audio is averaged to mono. Packets the codec reports as
/// corrupt are skipped; any other error aborts decoding.
///
/// # Arguments
/// * `bytes` - Complete file contents
/// * `extension_hint` - File extension (e.g. "mp3") to speed up probing
///
/// # Errors
/// * Unrecognized container or codec
/// * No audio track, unknown sample rate
/// * No samples decoded
pub fn decode_audio_bytes(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<DecodedAudio> {
    if bytes.is_empty() {
        return Err(anyhow!("Empty input"));
    }

    let byte_len = bytes.len();
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = extension_hint {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio stream ({} bytes)", byte_len))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in stream")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channel_count = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(anyhow!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => all_samples.extend(convert_to_mono_f32(&decoded)),
            Err(SymphoniaError::DecodeError(msg)) => {
                skipped_packets += 1;
                tracing::debug!(error = msg, "Skipping undecodable packet");
            }
            Err(e) => return Err(anyhow!("Failed to decode packet: {}", e)),
        }
    }

    if all_samples.is_empty() {
        return Err(anyhow!(
            "No audio samples decoded ({} packets skipped)",
            skipped_packets
        ));
    }

    let duration_seconds = all_samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        sample_rate,
        channels = channel_count,
        total_samples = all_samples.len(),
        skipped_packets,
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: all_samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

/// Convert any decoded buffer to mono f32 by averaging channels
fn convert_to_mono_f32(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::F32(buf) => mix_to_mono(buf),
        AudioBufferRef::U8(buf) => mix_to_mono(buf),
        AudioBufferRef::U16(buf) => mix_to_mono(buf),
        AudioBufferRef::U24(buf) => mix_to_mono(buf),
        AudioBufferRef::U32(buf) => mix_to_mono(buf),
        AudioBufferRef::S8(buf) => mix_to_mono(buf),
        AudioBufferRef::S16(buf) => mix_to_mono(buf),
        AudioBufferRef::S24(buf) => mix_to_mono(buf),
        AudioBufferRef::S32(buf) => mix_to_mono(buf),
        AudioBufferRef::F64(buf) => mix_to_mono(buf),
    }
}

fn mix_to_mono<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count().max(1);
    let num_frames = buf.frames();
    let mut mono = vec![0.0f32; num_frames];

    for ch in 0..num_channels {
        for (acc, &sample) in mono.iter_mut().zip(buf.chan(ch)) {
            *acc += f32::from_sample(sample);
        }
    }

    let scale = 1.0 / num_channels as f32;
    for value in &mut mono {
        *value *= scale;
    }
    mono
}
