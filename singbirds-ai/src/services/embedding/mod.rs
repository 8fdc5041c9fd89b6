//! Distance and embedding engine
//!
//! Projects assembled feature vectors to 2-D with an interchangeable
//! `Projector` strategy. The engine is pure: it does no I/O and the same
//! input and seed always give the same layout.

pub mod distance;
pub mod nmds;
pub mod umap;

use crate::error::AcousticError;
use crate::models::{EmbeddingStrategy, LabeledVector, ProjectedPoint, ASSEMBLED_DIM};

pub use nmds::NmdsProjector;
pub use umap::GraphProjector;

/// Default seed for every strategy
pub const DEFAULT_SEED: u64 = 42;

/// A dimensionality-reduction strategy
pub trait Projector: Send + Sync {
    /// Wire name of the strategy
    fn name(&self) -> &'static str;

    /// Map `vectors` to one 2-D coordinate each, in input order
    ///
    /// # Errors
    /// `AcousticError::InsufficientData` for fewer than two vectors.
    fn project(&self, vectors: &[Vec<f64>], seed: u64) -> Result<Vec<[f64; 2]>, AcousticError>;
}

/// Layout for exactly two points: `±0.5` on the x axis, or both at the
/// origin when they are indistinguishable
pub(crate) fn two_point_layout(distance: f64) -> Vec<[f64; 2]> {
    if distance > 0.0 {
        vec![[-0.5, 0.0], [0.5, 0.0]]
    } else {
        vec![[0.0, 0.0], [0.0, 0.0]]
    }
}

/// Per-dimension z-score (population variance); constant dimensions become 0
pub fn standardize(vectors: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(dim) = vectors.first().map(Vec::len) else {
        return Vec::new();
    };
    let n = vectors.len() as f64;

    let mut out = vectors.to_vec();
    for d in 0..dim {
        let mean = vectors.iter().map(|v| v[d]).sum::<f64>() / n;
        let variance = vectors.iter().map(|v| (v[d] - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        for row in out.iter_mut() {
            row[d] = if std > 0.0 { (row[d] - mean) / std } else { 0.0 };
        }
    }
    out
}

/// Projector implementing a named strategy
pub fn projector_for(strategy: EmbeddingStrategy) -> Box<dyn Projector> {
    match strategy {
        EmbeddingStrategy::MetricMds => Box::new(NmdsProjector::default()),
        EmbeddingStrategy::GraphEmbedding => Box::new(GraphProjector::default()),
    }
}

/// Filters unusable vectors and runs a projector
#[derive(Debug, Clone)]
pub struct EmbeddingEngine {
    dimension: usize,
}

impl Default for EmbeddingEngine {
    fn default() -> Self {
        Self {
            dimension: ASSEMBLED_DIM,
        }
    }
}

impl EmbeddingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept vectors of a different fixed length
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Project with one of the built-in strategies
    pub fn project(
        &self,
        strategy: EmbeddingStrategy,
        vectors: &[LabeledVector],
        seed: u64,
    ) -> Result<Vec<ProjectedPoint>, AcousticError> {
        self.project_with(projector_for(strategy).as_ref(), vectors, seed)
    }

    /// Project with any strategy
    ///
    /// Vectors of the wrong length or with non-finite components are left
    /// out of the projection and the output. Output order follows input
    /// order.
    pub fn project_with(
        &self,
        projector: &dyn Projector,
        vectors: &[LabeledVector],
        seed: u64,
    ) -> Result<Vec<ProjectedPoint>, AcousticError> {
        let usable: Vec<&LabeledVector> = vectors
            .iter()
            .filter(|v| {
                let ok = v.vector.len() == self.dimension && v.vector.iter().all(|x| x.is_finite());
                if !ok {
                    tracing::warn!(
                        entity_id = %v.entity_id,
                        len = v.vector.len(),
                        "Skipping unusable vector"
                    );
                }
                ok
            })
            .collect();

        if usable.len() < 2 {
            return Err(AcousticError::InsufficientData {
                usable: usable.len(),
            });
        }

        let matrix: Vec<Vec<f64>> = usable.iter().map(|v| v.vector.clone()).collect();
        let coordinates = projector.project(&matrix, seed)?;

        if coordinates.len() != usable.len() {
            return Err(AcousticError::Extraction(format!(
                "{} returned {} coordinates for {} vectors",
                projector.name(),
                coordinates.len(),
                usable.len()
            )));
        }

        tracing::info!(
            strategy = projector.name(),
            points = usable.len(),
            dropped = vectors.len() - usable.len(),
            seed,
            "Projection complete"
        );

        Ok(usable
            .into_iter()
            .zip(coordinates)
            .map(|(v, [x, y])| ProjectedPoint {
                entity_id: v.entity_id.clone(),
                label: v.label.clone(),
                x,
                y,
            })
            .collect())
    }
}
