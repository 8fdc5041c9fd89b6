//! Feature vector assembly
//!
//! Rebuilds a fixed 38-dimensional vector from a stored feature row. Vector
//! fields are parsed strictly: a field is either used whole or replaced by
//! zeros, never partially trusted. Missing or non-finite scalars become 0.
//!
//! Layout: MFCC(13) | chroma(12) | bandwidth | flatness | contrast(7) |
//! RMS | ZCR | centroid | rolloff

use serde_json::Value;
use std::fmt;

use crate::error::AcousticError;
use crate::models::{StoredFeatureRow, ASSEMBLED_DIM, CHROMA_DIM, CONTRAST_DIM, MFCC_DIM};

/// Why a field was zero-filled
#[derive(Debug, Clone, PartialEq)]
pub enum ZeroFillReason {
    Missing,
    Malformed,
    DimensionMismatch { expected: usize, actual: usize },
    NonFinite,
}

impl fmt::Display for ZeroFillReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZeroFillReason::Missing => f.write_str("missing"),
            ZeroFillReason::Malformed => f.write_str("malformed"),
            ZeroFillReason::DimensionMismatch { expected, actual } => {
                write!(f, "expected {} values, got {}", expected, actual)
            }
            ZeroFillReason::NonFinite => f.write_str("non-finite"),
        }
    }
}

/// Parse result for one stored field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    Valid(Vec<f64>),
    ZeroFilled(ZeroFillReason),
}

impl FieldOutcome {
    /// Values to splice into the assembled vector, `dim` long
    fn values(&self, dim: usize) -> Vec<f64> {
        match self {
            FieldOutcome::Valid(values) => values.clone(),
            FieldOutcome::ZeroFilled(_) => vec![0.0; dim],
        }
    }
}

/// Parse a JSON-array vector field of declared length `dim`
pub fn parse_vector_field(raw: Option<&str>, dim: usize) -> FieldOutcome {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return FieldOutcome::ZeroFilled(ZeroFillReason::Missing);
    };

    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => return FieldOutcome::ZeroFilled(ZeroFillReason::Missing),
        _ => return FieldOutcome::ZeroFilled(ZeroFillReason::Malformed),
    };

    if items.len() != dim {
        return FieldOutcome::ZeroFilled(ZeroFillReason::DimensionMismatch {
            expected: dim,
            actual: items.len(),
        });
    }

    let mut values = Vec::with_capacity(dim);
    for item in &items {
        match item.as_f64() {
            Some(v) if v.is_finite() => values.push(v),
            Some(_) => return FieldOutcome::ZeroFilled(ZeroFillReason::NonFinite),
            None => return FieldOutcome::ZeroFilled(ZeroFillReason::Malformed),
        }
    }
    FieldOutcome::Valid(values)
}

/// Fixed-length vector plus the fields that had to be zero-filled
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledVector {
    pub recording_id: String,
    pub entity_id: String,
    pub vector: Vec<f64>,
    pub zero_filled: Vec<(&'static str, ZeroFillReason)>,
}

impl AssembledVector {
    /// True when every component is zero
    pub fn is_all_zero(&self) -> bool {
        self.vector.iter().all(|&v| v == 0.0)
    }

    /// Dimension mismatches, as pipeline errors for logging
    pub fn dimension_errors(&self) -> Vec<AcousticError> {
        self.zero_filled
            .iter()
            .filter_map(|(field, reason)| match reason {
                ZeroFillReason::DimensionMismatch { expected, actual } => {
                    Some(AcousticError::DimensionMismatch {
                        field: *field,
                        expected: *expected,
                        actual: *actual,
                    })
                }
                _ => None,
            })
            .collect()
    }
}

fn scalar(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Assemble one stored row into a 38-dimensional vector
pub fn assemble(row: &StoredFeatureRow) -> AssembledVector {
    let mut zero_filled = Vec::new();
    let mut vector = Vec::with_capacity(ASSEMBLED_DIM);

    let mut splice = |name: &'static str, raw: Option<&str>, dim: usize, out: &mut Vec<f64>| {
        let outcome = parse_vector_field(raw, dim);
        if let FieldOutcome::ZeroFilled(reason) = &outcome {
            zero_filled.push((name, reason.clone()));
        }
        out.extend(outcome.values(dim));
    };

    splice("mfcc", row.mfcc.as_deref(), MFCC_DIM, &mut vector);
    splice("chroma", row.chroma.as_deref(), CHROMA_DIM, &mut vector);
    vector.push(scalar(row.spectral_bandwidth));
    vector.push(scalar(row.spectral_flatness));
    splice(
        "spectral_contrast",
        row.spectral_contrast.as_deref(),
        CONTRAST_DIM,
        &mut vector,
    );
    vector.push(scalar(row.rms_energy));
    vector.push(scalar(row.zero_crossing_rate));
    vector.push(scalar(row.spectral_centroid));
    vector.push(scalar(row.spectral_rolloff));

    debug_assert_eq!(vector.len(), ASSEMBLED_DIM);

    AssembledVector {
        recording_id: row.recording_id.clone(),
        entity_id: row.entity_id.clone(),
        vector,
        zero_filled,
    }
}

/// Assemble every row, logging zero-filled fields
///
/// Rows that collapse to all zeros are kept.
pub fn assemble_all(rows: &[StoredFeatureRow]) -> Vec<AssembledVector> {
    rows.iter()
        .map(|row| {
            let assembled = assemble(row);
            for error in assembled.dimension_errors() {
                tracing::warn!(
                    recording_id = %assembled.recording_id,
                    error = %error,
                    "Feature field has the wrong length, zero-filled"
                );
            }
            for (field, reason) in &assembled.zero_filled {
                if matches!(reason, ZeroFillReason::DimensionMismatch { .. }) {
                    continue;
                }
                tracing::warn!(
                    recording_id = %assembled.recording_id,
                    field = *field,
                    reason = %reason,
                    "Feature field zero-filled"
                );
            }
            if assembled.is_all_zero() {
                tracing::warn!(
                    recording_id = %assembled.recording_id,
                    "Assembled vector is all zeros"
                );
            }
            assembled
        })
        .collect()
}
