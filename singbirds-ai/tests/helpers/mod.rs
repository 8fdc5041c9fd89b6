//! Shared fixtures for singbirds-ai integration tests
#![allow(dead_code)]

pub mod audio_generator;
pub mod fakes;

pub use audio_generator::{noise_wav, silent_wav, tone_wav};
pub use fakes::{seed_entity, test_app_state, UrlFetcher};
