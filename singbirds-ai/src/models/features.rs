//! Acoustic feature records
//!
//! `AcousticFeatures` is what the extractor produces; its vector fields are
//! fixed-size arrays so a wrong length cannot be constructed. Rows read back
//! from storage are `StoredFeatureRow`, whose vector fields are raw JSON and
//! must go through the assembler before use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of mel-frequency cepstral coefficients
pub const MFCC_DIM: usize = 13;
/// Number of pitch classes in the chroma profile
pub const CHROMA_DIM: usize = 12;
/// Number of spectral-contrast bands
pub const CONTRAST_DIM: usize = 7;
/// MFCC + chroma + bandwidth + flatness + contrast + RMS + ZCR + centroid + rolloff
pub const ASSEMBLED_DIM: usize = MFCC_DIM + CHROMA_DIM + 1 + 1 + CONTRAST_DIM + 1 + 1 + 1 + 1;

/// Time-averaged feature record for one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcousticFeatures {
    pub mfcc: [f64; MFCC_DIM],
    pub chroma: [f64; CHROMA_DIM],
    pub spectral_bandwidth: f64,
    pub spectral_contrast: [f64; CONTRAST_DIM],
    pub spectral_flatness: f64,
    pub rms_energy: f64,
    pub zero_crossing_rate: f64,
    pub spectral_centroid: f64,
    pub spectral_rolloff: f64,
}

impl AcousticFeatures {
    /// True when every value is finite
    pub fn is_finite(&self) -> bool {
        self.mfcc.iter().all(|v| v.is_finite())
            && self.chroma.iter().all(|v| v.is_finite())
            && self.spectral_contrast.iter().all(|v| v.is_finite())
            && [
                self.spectral_bandwidth,
                self.spectral_flatness,
                self.rms_energy,
                self.zero_crossing_rate,
                self.spectral_centroid,
                self.spectral_rolloff,
            ]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Extracted features waiting to be bulk-inserted
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFeatureRow {
    pub recording_id: String,
    pub entity_id: String,
    pub features: AcousticFeatures,
    pub created_at: DateTime<Utc>,
}

impl PendingFeatureRow {
    pub fn new(
        recording_id: impl Into<String>,
        entity_id: impl Into<String>,
        features: AcousticFeatures,
    ) -> Self {
        Self {
            recording_id: recording_id.into(),
            entity_id: entity_id.into(),
            features,
            created_at: Utc::now(),
        }
    }
}

/// Feature row as persisted, with vector fields still serialized
#[derive(Debug, Clone, PartialEq, Default, sqlx::FromRow)]
pub struct StoredFeatureRow {
    pub recording_id: String,
    pub entity_id: String,
    pub mfcc: Option<String>,
    pub chroma: Option<String>,
    pub spectral_bandwidth: Option<f64>,
    pub spectral_contrast: Option<String>,
    pub spectral_flatness: Option<f64>,
    pub rms_energy: Option<f64>,
    pub zero_crossing_rate: Option<f64>,
    pub spectral_centroid: Option<f64>,
    pub spectral_rolloff: Option<f64>,
    pub created_at: Option<String>,
}
