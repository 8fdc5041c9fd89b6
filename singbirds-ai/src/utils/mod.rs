//! Utility modules

pub mod audio_decoder;
pub mod framing;
