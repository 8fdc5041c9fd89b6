//! Non-metric multidimensional scaling
//!
//! SMACOF majorization where, each iteration, target distances
//! ("disparities") are refit as the best monotone function of the input
//! dissimilarities (pool-adjacent-violators). Several seeded random starts
//! are run and the lowest-stress layout wins.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::distance::{cosine_distance_matrix, euclidean};
use super::{two_point_layout, Projector};
use crate::error::AcousticError;

const N_COMPONENTS: usize = 2;

/// Stress-minimizing non-metric MDS on cosine distances
#[derive(Debug, Clone)]
pub struct NmdsProjector {
    pub n_init: usize,
    pub max_iter: usize,
    pub eps: f64,
}

impl Default for NmdsProjector {
    fn default() -> Self {
        Self {
            n_init: 4,
            max_iter: 300,
            eps: 1e-3,
        }
    }
}

impl Projector for NmdsProjector {
    fn name(&self) -> &'static str {
        "nmds"
    }

    fn project(&self, vectors: &[Vec<f64>], seed: u64) -> Result<Vec<[f64; 2]>, AcousticError> {
        if vectors.len() < 2 {
            return Err(AcousticError::InsufficientData {
                usable: vectors.len(),
            });
        }

        let dissimilarities = cosine_distance_matrix(vectors);
        if vectors.len() == 2 {
            return Ok(two_point_layout(dissimilarities[0][1]));
        }

        Ok(self.fit(&dissimilarities, seed))
    }
}

impl NmdsProjector {
    /// Run SMACOF from `n_init` seeded starts and keep the best layout
    pub fn fit(&self, dissimilarities: &[Vec<f64>], seed: u64) -> Vec<[f64; 2]> {
        let n = dissimilarities.len();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut best: Option<(f64, Vec<[f64; 2]>)> = None;
        for init in 0..self.n_init.max(1) {
            let start: Vec<[f64; 2]> = (0..n).map(|_| [rng.gen::<f64>(), rng.gen::<f64>()]).collect();
            let (stress, layout, iterations) = self.smacof_single(dissimilarities, start);

            tracing::debug!(init, stress, iterations, "NMDS start finished");

            if best.as_ref().map_or(true, |(best_stress, _)| stress < *best_stress) {
                best = Some((stress, layout));
            }
        }

        best.map(|(_, layout)| layout).unwrap_or_default()
    }

    /// One SMACOF run; returns (normalized stress, layout, iterations)
    fn smacof_single(
        &self,
        dissimilarities: &[Vec<f64>],
        mut x: Vec<[f64; 2]>,
    ) -> (f64, Vec<[f64; 2]>, usize) {
        let n = x.len();

        // Upper-triangle pairs ordered by dissimilarity; zero dissimilarities
        // do not constrain the monotone fit.
        let mut ranked: Vec<(usize, usize, f64)> = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                if dissimilarities[i][j] != 0.0 {
                    ranked.push((i, j, dissimilarities[i][j]));
                }
            }
        }
        ranked.sort_by(|a, b| a.2.total_cmp(&b.2));

        let pair_count = (n * (n - 1) / 2) as f64;
        let mut old_stress: Option<f64> = None;
        let mut stress = f64::INFINITY;
        let mut iterations = 0;

        for iteration in 0..self.max_iter {
            iterations = iteration + 1;
            let mut dis = pairwise_distances(&x);

            // Disparities default to the current distances
            let mut disparities = dis.clone();
            let fitted = isotonic_fit(
                &ranked.iter().map(|&(_, _, d)| d).collect::<Vec<_>>(),
                &ranked.iter().map(|&(i, j, _)| dis[i][j]).collect::<Vec<_>>(),
            );
            for (&(i, j, _), value) in ranked.iter().zip(fitted) {
                disparities[i][j] = value;
                disparities[j][i] = value;
            }

            let sum_sq: f64 = upper_triangle(&disparities).map(|v| v * v).sum();
            if sum_sq > 0.0 {
                let scale = (pair_count / sum_sq).sqrt();
                for row in disparities.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= scale;
                    }
                }
            }

            let raw_stress: f64 = (0..n)
                .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
                .map(|(i, j)| (dis[i][j] - disparities[i][j]).powi(2))
                .sum();
            let norm: f64 = upper_triangle(&disparities).map(|v| v * v).sum();
            stress = if norm > 0.0 {
                (raw_stress / norm).sqrt()
            } else {
                0.0
            };

            // Guttman transform
            for row in dis.iter_mut() {
                for v in row.iter_mut() {
                    if *v == 0.0 {
                        *v = 1e-5;
                    }
                }
            }
            let mut b = vec![vec![0.0; n]; n];
            for i in 0..n {
                let mut row_sum = 0.0;
                for j in 0..n {
                    if i != j {
                        let ratio = disparities[i][j] / dis[i][j];
                        b[i][j] = -ratio;
                        row_sum += ratio;
                    }
                }
                b[i][i] = row_sum;
            }
            x = (0..n)
                .map(|i| {
                    let mut point = [0.0; N_COMPONENTS];
                    for (j, xj) in x.iter().enumerate() {
                        for (c, value) in point.iter_mut().enumerate() {
                            *value += b[i][j] * xj[c];
                        }
                    }
                    point.map(|v| v / n as f64)
                })
                .collect();

            if let Some(old) = old_stress {
                if old - stress < self.eps {
                    break;
                }
            }
            old_stress = Some(stress);
        }

        for point in x.iter_mut() {
            for v in point.iter_mut() {
                if !v.is_finite() {
                    *v = 0.0;
                }
            }
        }

        (stress, x, iterations)
    }
}

fn pairwise_distances(x: &[[f64; 2]]) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut dis = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(&x[i], &x[j]);
            dis[i][j] = d;
            dis[j][i] = d;
        }
    }
    dis
}

fn upper_triangle(matrix: &[Vec<f64>]) -> impl Iterator<Item = f64> + '_ {
    matrix
        .iter()
        .enumerate()
        .flat_map(|(i, row)| row[i + 1..].iter().copied())
}

/// Non-decreasing least-squares fit of `y` ordered by ascending `x`
///
/// `x` must already be sorted. Equal `x` values share one fitted value.
pub fn isotonic_fit(x: &[f64], y: &[f64]) -> Vec<f64> {
    // Blocks of (sum, weight, first index, last index)
    let mut blocks: Vec<(f64, f64, usize, usize)> = Vec::with_capacity(y.len());

    let mut i = 0;
    while i < y.len() {
        let mut end = i;
        let mut sum = y[i];
        while end + 1 < y.len() && x[end + 1] == x[i] {
            end += 1;
            sum += y[end];
        }
        blocks.push((sum, (end - i + 1) as f64, i, end));

        while blocks.len() > 1 {
            let last = blocks[blocks.len() - 1];
            let prev = blocks[blocks.len() - 2];
            if prev.0 / prev.1 <= last.0 / last.1 {
                break;
            }
            blocks.pop();
            let merged = blocks.len() - 1;
            blocks[merged] = (prev.0 + last.0, prev.1 + last.1, prev.2, last.3);
        }
        i = end + 1;
    }

    let mut fitted = vec![0.0; y.len()];
    for (sum, weight, start, end) in blocks {
        let mean = sum / weight;
        for value in &mut fitted[start..=end] {
            *value = mean;
        }
    }
    fitted
}
