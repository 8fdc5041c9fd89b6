//! Neighbor-graph embedding
//!
//! Builds a fuzzy k-nearest-neighbor graph on standardized vectors and lays
//! it out in 2-D by stochastic gradient descent: sampled graph edges pull
//! their endpoints together, random non-neighbors push apart.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::distance::{euclidean, squared_euclidean};
use super::{standardize, two_point_layout, Projector};
use crate::error::AcousticError;

/// Curve parameters for the low-dimensional similarity `1 / (1 + a·d^2b)`
const A: f64 = 1.577;
const B: f64 = 0.895;

const GRADIENT_CLIP: f64 = 4.0;
const SIGMA_SEARCH_STEPS: usize = 64;
const SIGMA_TOLERANCE: f64 = 1e-5;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const INIT_RANGE: f64 = 10.0;

/// Graph-embedding projector
#[derive(Debug, Clone)]
pub struct GraphProjector {
    pub n_neighbors: usize,
    pub n_epochs: usize,
    pub negative_sample_rate: usize,
}

impl Default for GraphProjector {
    fn default() -> Self {
        Self {
            n_neighbors: 15,
            n_epochs: 200,
            negative_sample_rate: 5,
        }
    }
}

impl Projector for GraphProjector {
    fn name(&self) -> &'static str {
        "umap"
    }

    fn project(&self, vectors: &[Vec<f64>], seed: u64) -> Result<Vec<[f64; 2]>, AcousticError> {
        if vectors.len() < 2 {
            return Err(AcousticError::InsufficientData {
                usable: vectors.len(),
            });
        }

        let standardized = standardize(vectors);
        if standardized.len() == 2 {
            return Ok(two_point_layout(euclidean(&standardized[0], &standardized[1])));
        }

        let edges = self.fuzzy_graph(&standardized);
        tracing::debug!(points = standardized.len(), edges = edges.len(), "Neighbor graph built");

        Ok(self.optimize_layout(standardized.len(), &edges, seed))
    }
}

/// Undirected weighted edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub head: usize,
    pub tail: usize,
    pub weight: f64,
}

impl GraphProjector {
    /// Symmetric fuzzy neighbor graph as an edge list (`head < tail`)
    pub fn fuzzy_graph(&self, points: &[Vec<f64>]) -> Vec<Edge> {
        let n = points.len();
        let k = self.n_neighbors.min(n - 1).max(1);
        let target = ((k + 1) as f64).log2();

        let mut membership = vec![vec![0.0; n]; n];
        let mean_distance = {
            let total: f64 = (0..n)
                .flat_map(|i| (0..n).map(move |j| (i, j)))
                .filter(|(i, j)| i != j)
                .map(|(i, j)| euclidean(&points[i], &points[j]))
                .sum();
            total / (n * (n - 1)) as f64
        };

        for i in 0..n {
            let mut neighbors: Vec<(usize, f64)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (j, euclidean(&points[i], &points[j])))
                .collect();
            neighbors.sort_by(|a, b| a.1.total_cmp(&b.1));
            neighbors.truncate(k);

            let rho = neighbors
                .iter()
                .map(|&(_, d)| d)
                .find(|&d| d > 0.0)
                .unwrap_or(0.0);
            let sigma = smooth_knn_sigma(&neighbors, rho, target).max(MIN_K_DIST_SCALE * mean_distance);

            for &(j, d) in &neighbors {
                membership[i][j] = if sigma > 0.0 {
                    (-(d - rho).max(0.0) / sigma).exp()
                } else {
                    1.0
                };
            }
        }

        let mut edges = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (membership[i][j], membership[j][i]);
                let weight = a + b - a * b;
                if weight > 0.0 {
                    edges.push(Edge {
                        head: i,
                        tail: j,
                        weight,
                    });
                }
            }
        }
        edges
    }

    /// Stochastic gradient layout from a seeded uniform start
    pub fn optimize_layout(&self, n: usize, edges: &[Edge], seed: u64) -> Vec<[f64; 2]> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut embedding: Vec<[f64; 2]> = (0..n)
            .map(|_| {
                [
                    rng.gen_range(-INIT_RANGE..INIT_RANGE),
                    rng.gen_range(-INIT_RANGE..INIT_RANGE),
                ]
            })
            .collect();

        let max_weight = edges.iter().map(|e| e.weight).fold(0.0, f64::max);
        if max_weight <= 0.0 {
            return embedding;
        }

        // Stronger edges are sampled more often
        let epochs_per_sample: Vec<f64> = edges.iter().map(|e| max_weight / e.weight).collect();
        let mut next_sample = epochs_per_sample.clone();

        for epoch in 0..self.n_epochs {
            let alpha = 1.0 - epoch as f64 / self.n_epochs as f64;

            for (e, edge) in edges.iter().enumerate() {
                if next_sample[e] > (epoch + 1) as f64 {
                    continue;
                }
                next_sample[e] += epochs_per_sample[e];

                let (i, j) = (edge.head, edge.tail);
                let dist_sq = squared_euclidean(&embedding[i], &embedding[j]);
                let coeff = if dist_sq > 0.0 {
                    -2.0 * A * B * dist_sq.powf(B - 1.0) / (A * dist_sq.powf(B) + 1.0)
                } else {
                    0.0
                };
                for c in 0..2 {
                    let grad = clip(coeff * (embedding[i][c] - embedding[j][c]));
                    embedding[i][c] += grad * alpha;
                    embedding[j][c] -= grad * alpha;
                }

                for _ in 0..self.negative_sample_rate {
                    let other = rng.gen_range(0..n);
                    if other == i {
                        continue;
                    }
                    let dist_sq = squared_euclidean(&embedding[i], &embedding[other]);
                    let coeff = if dist_sq > 0.0 {
                        2.0 * B / ((0.001 + dist_sq) * (A * dist_sq.powf(B) + 1.0))
                    } else {
                        0.0
                    };
                    for c in 0..2 {
                        let grad = if coeff > 0.0 {
                            clip(coeff * (embedding[i][c] - embedding[other][c]))
                        } else {
                            GRADIENT_CLIP
                        };
                        embedding[i][c] += grad * alpha;
                    }
                }
            }
        }

        for point in embedding.iter_mut() {
            for v in point.iter_mut() {
                if !v.is_finite() {
                    *v = 0.0;
                }
            }
        }
        embedding
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

/// Binary search for the bandwidth whose membership sum hits `target`
fn smooth_knn_sigma(neighbors: &[(usize, f64)], rho: f64, target: f64) -> f64 {
    let mut lo = 0.0;
    let mut hi = f64::INFINITY;
    let mut mid = 1.0;

    for _ in 0..SIGMA_SEARCH_STEPS {
        let psum: f64 = neighbors
            .iter()
            .map(|&(_, d)| {
                let excess = d - rho;
                if excess > 0.0 {
                    (-excess / mid).exp()
                } else {
                    1.0
                }
            })
            .sum();

        if (psum - target).abs() < SIGMA_TOLERANCE {
            break;
        }

        if psum > target {
            hi = mid;
            mid = (lo + hi) / 2.0;
        } else {
            lo = mid;
            mid = if hi.is_infinite() { mid * 2.0 } else { (lo + hi) / 2.0 };
        }
    }
    mid
}
