//! Seeded k-means over Lab triples
//!
//! k-means++ seeding followed by Lloyd iterations, repeated for a number of
//! restarts from one seeded stream; the run with the lowest inertia wins.

use crate::lab::distance_sq;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iterations: usize,
    /// Stop once the summed squared movement of all centers falls below this
    pub tolerance: f32,
    pub restarts: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centers: Vec<[f32; 3]>,
    /// Sum of squared distances from each point to its assigned center
    pub inertia: f32,
    pub iterations: usize,
}

/// Cluster `points` into exactly `params.k` groups.
///
/// Returns `None` if there are no points or `k` is zero.
pub fn kmeans(points: &[[f32; 3]], params: &KMeansParams) -> Option<Clustering> {
    if points.is_empty() || params.k == 0 {
        return None;
    }

    let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
    let mut best: Option<Clustering> = None;

    for _ in 0..params.restarts.max(1) {
        let seeds = init_plus_plus(points, params.k, &mut rng);
        let run = lloyd(points, seeds, params.max_iterations, params.tolerance);
        if best.as_ref().map_or(true, |b| run.inertia < b.inertia) {
            best = Some(run);
        }
    }
    best
}

fn nearest(point: &[f32; 3], centers: &[[f32; 3]]) -> (usize, f32) {
    centers
        .iter()
        .enumerate()
        .map(|(i, c)| (i, distance_sq(point, c)))
        .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding. When every remaining weight is zero (all points already
/// coincide with a chosen center) the next center is drawn uniformly.
fn init_plus_plus<R: Rng>(points: &[[f32; 3]], k: usize, rng: &mut R) -> Vec<[f32; 3]> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..points.len())]);

    let mut weights: Vec<f32> = points.iter().map(|p| distance_sq(p, &centers[0])).collect();

    while centers.len() < k {
        let total: f32 = weights.iter().sum();
        let index = if total > 0.0 && total.is_finite() {
            let target = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            weights
                .iter()
                .position(|&w| {
                    cumulative += w;
                    cumulative > target
                })
                .unwrap_or(points.len() - 1)
        } else {
            rng.gen_range(0..points.len())
        };

        let chosen = points[index];
        centers.push(chosen);
        for (w, p) in weights.iter_mut().zip(points) {
            *w = w.min(distance_sq(p, &chosen));
        }
    }
    centers
}

fn lloyd(points: &[[f32; 3]], mut centers: Vec<[f32; 3]>, max_iterations: usize, tolerance: f32) -> Clustering {
    let k = centers.len();
    let mut iterations = 0;

    for _ in 0..max_iterations {
        iterations += 1;

        let mut sums = vec![[0.0f64; 3]; k];
        let mut counts = vec![0usize; k];
        for p in points {
            let (i, _) = nearest(p, &centers);
            counts[i] += 1;
            for c in 0..3 {
                sums[i][c] += p[c] as f64;
            }
        }

        let mut shift = 0.0;
        for i in 0..k {
            // Empty clusters keep their previous center
            if counts[i] == 0 {
                continue;
            }
            let n = counts[i] as f64;
            let updated = [
                (sums[i][0] / n) as f32,
                (sums[i][1] / n) as f32,
                (sums[i][2] / n) as f32,
            ];
            shift += distance_sq(&centers[i], &updated);
            centers[i] = updated;
        }

        if shift <= tolerance {
            break;
        }
    }

    let inertia = points.iter().map(|p| nearest(p, &centers).1).sum();
    Clustering {
        centers,
        inertia,
        iterations,
    }
}
