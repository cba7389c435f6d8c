//! Seeded k-means clustering over RGB pixels.
//!
//! k-means++ initialisation (greedy, with local trials), Lloyd iterations,
//! and several restarts keeping the lowest-inertia run. Deterministic for a
//! given seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A point in RGB space.
pub type Point = [f64; 3];

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct KMeans {
    pub clusters: usize,
    pub n_init: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: u64,
}

/// Result of a clustering run.
#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub centroids: Vec<Point>,
    /// Number of points assigned to each centroid
    pub counts: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    /// Lloyd iterations of the winning run
    pub iterations: usize,
}

impl KMeans {
    /// Cluster `points`. Fails when there are fewer points than clusters.
    pub fn fit(&self, points: &[Point]) -> Result<KMeansFit, String> {
        if self.clusters == 0 {
            return Err("cluster count must be > 0".to_string());
        }
        if points.len() < self.clusters {
            return Err(format!(
                "{} pixels is fewer than the {} requested clusters",
                points.len(),
                self.clusters
            ));
        }

        let tolerance = self.tolerance * mean_variance(points);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init.max(1) {
            let init = kmeans_plus_plus(points, self.clusters, &mut rng);
            let fit = self.lloyd(points, init, tolerance);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| "no clustering run completed".to_string())
    }

    fn lloyd(&self, points: &[Point], mut centroids: Vec<Point>, tolerance: f64) -> KMeansFit {
        let k = centroids.len();
        let mut labels = vec![0usize; points.len()];
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            assign(points, &centroids, &mut labels);

            let mut sums = vec![[0.0f64; 3]; k];
            let mut counts = vec![0usize; k];
            for (p, &label) in points.iter().zip(&labels) {
                for c in 0..3 {
                    sums[label][c] += p[c];
                }
                counts[label] += 1;
            }

            let mut updated = centroids.clone();
            for j in 0..k {
                if counts[j] > 0 {
                    for c in 0..3 {
                        updated[j][c] = sums[j][c] / counts[j] as f64;
                    }
                } else {
                    // Empty cluster: move it to the point farthest from its centroid.
                    let far = farthest_point(points, &centroids, &labels);
                    updated[j] = points[far];
                }
            }

            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| squared_distance(a, b))
                .sum();
            centroids = updated;
            if shift <= tolerance {
                break;
            }
        }

        // Final assignment against the converged centroids.
        assign(points, &centroids, &mut labels);
        let mut counts = vec![0usize; k];
        let mut inertia = 0.0;
        for (p, &label) in points.iter().zip(&labels) {
            counts[label] += 1;
            inertia += squared_distance(p, &centroids[label]);
        }

        KMeansFit {
            centroids,
            counts,
            inertia,
            iterations,
        }
    }
}

/// Greedy k-means++: each new centre is the best of several
/// distance-weighted candidates.
fn kmeans_plus_plus(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let trials = 2 + (k as f64).ln().floor() as usize;
    let mut centres = Vec::with_capacity(k);
    centres.push(points[rng.gen_range(0..points.len())]);

    let mut closest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centres[0]))
        .collect();
    let mut potential: f64 = closest.iter().sum();

    while centres.len() < k {
        let mut best: Option<(f64, usize, Vec<f64>)> = None;
        for _ in 0..trials {
            let candidate = if potential > 0.0 {
                sample_weighted(&closest, potential, rng)
            } else {
                rng.gen_range(0..points.len())
            };
            let distances: Vec<f64> = points
                .iter()
                .zip(&closest)
                .map(|(p, &d)| d.min(squared_distance(p, &points[candidate])))
                .collect();
            let candidate_potential: f64 = distances.iter().sum();
            if best
                .as_ref()
                .map_or(true, |(pot, _, _)| candidate_potential < *pot)
            {
                best = Some((candidate_potential, candidate, distances));
            }
        }

        if let Some((pot, index, distances)) = best {
            centres.push(points[index]);
            closest = distances;
            potential = pot;
        }
    }

    centres
}

fn sample_weighted(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let mut target = rng.gen::<f64>() * total;
    for (i, &w) in weights.iter().enumerate() {
        if target < w {
            return i;
        }
        target -= w;
    }
    weights.len() - 1
}

fn assign(points: &[Point], centroids: &[Point], labels: &mut [usize]) {
    for (p, label) in points.iter().zip(labels.iter_mut()) {
        *label = nearest(p, centroids);
    }
}

fn nearest(p: &Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (j, c) in centroids.iter().enumerate() {
        let d = squared_distance(p, c);
        if d < best_distance {
            best = j;
            best_distance = d;
        }
    }
    best
}

fn farthest_point(points: &[Point], centroids: &[Point], labels: &[usize]) -> usize {
    let mut far = 0;
    let mut far_distance = -1.0;
    for (i, (p, &label)) in points.iter().zip(labels).enumerate() {
        let d = squared_distance(p, &centroids[label]);
        if d > far_distance {
            far = i;
            far_distance = d;
        }
    }
    far
}

fn squared_distance(a: &Point, b: &Point) -> f64 {
    (0..3).map(|c| (a[c] - b[c]).powi(2)).sum()
}

/// Mean of the per-channel variances, used to scale the tolerance.
fn mean_variance(points: &[Point]) -> f64 {
    let n = points.len() as f64;
    let mut total = 0.0;
    for c in 0..3 {
        let mean = points.iter().map(|p| p[c]).sum::<f64>() / n;
        total += points.iter().map(|p| (p[c] - mean).powi(2)).sum::<f64>() / n;
    }
    total / 3.0
}
