//! Seeded k-means over RGB samples.
//!
//! k-means++ seeding followed by Lloyd iterations, repeated `n_init`
//! times; the run with the lowest inertia wins. With a fixed seed the
//! result depends only on the input samples.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Fitted clusters
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<[f64; 3]>,
    /// Sum of squared distances of samples to their centroid
    pub inertia: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub k: usize,
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl KMeans {
    pub fn new(k: usize, seed: u64) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed,
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Fit the samples; `None` when there are fewer samples than clusters
    pub fn fit(&self, samples: &[[f64; 3]]) -> Option<KMeansFit> {
        if self.k == 0 || samples.len() < self.k {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init {
            let centroids = self.init_plus_plus(samples, &mut rng);
            let fit = self.lloyd(samples, centroids);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best
    }

    fn init_plus_plus(&self, samples: &[[f64; 3]], rng: &mut StdRng) -> Vec<[f64; 3]> {
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(samples[rng.random_range(0..samples.len())]);

        let mut nearest: Vec<f64> = samples
            .iter()
            .map(|s| squared_distance(s, &centroids[0]))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = nearest.iter().sum();
            let next = if total <= 0.0 {
                // every sample sits on a centroid already
                rng.random_range(0..samples.len())
            } else {
                let mut target = rng.random::<f64>() * total;
                let mut chosen = samples.len() - 1;
                for (idx, d) in nearest.iter().enumerate() {
                    if target < *d {
                        chosen = idx;
                        break;
                    }
                    target -= d;
                }
                chosen
            };

            let centroid = samples[next];
            for (d, s) in nearest.iter_mut().zip(samples) {
                *d = d.min(squared_distance(s, &centroid));
            }
            centroids.push(centroid);
        }

        centroids
    }

    fn lloyd(&self, samples: &[[f64; 3]], mut centroids: Vec<[f64; 3]>) -> KMeansFit {
        let mut assignment = vec![0usize; samples.len()];

        for _ in 0..self.max_iter {
            for (slot, sample) in assignment.iter_mut().zip(samples) {
                *slot = nearest_centroid(sample, &centroids).0;
            }

            let mut sums = vec![[0.0f64; 3]; centroids.len()];
            let mut counts = vec![0usize; centroids.len()];
            for (&cluster, sample) in assignment.iter().zip(samples) {
                for c in 0..3 {
                    sums[cluster][c] += sample[c];
                }
                counts[cluster] += 1;
            }

            let mut shift = 0.0;
            for (idx, centroid) in centroids.iter_mut().enumerate() {
                // empty clusters keep their previous position
                if counts[idx] == 0 {
                    continue;
                }
                let n = counts[idx] as f64;
                let updated = [sums[idx][0] / n, sums[idx][1] / n, sums[idx][2] / n];
                shift += squared_distance(centroid, &updated);
                *centroid = updated;
            }

            if shift <= self.tolerance {
                break;
            }
        }

        let inertia = samples
            .iter()
            .map(|s| nearest_centroid(s, &centroids).1)
            .sum();

        KMeansFit { centroids, inertia }
    }
}

fn nearest_centroid(sample: &[f64; 3], centroids: &[[f64; 3]]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(idx, c)| (idx, squared_distance(sample, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (0..3).map(|i| (a[i] - b[i]).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cluster_is_mean() {
        let samples = vec![[10.0, 20.0, 30.0], [20.0, 40.0, 60.0], [30.0, 60.0, 90.0]];
        let fit = KMeans::new(1, 42).fit(&samples).unwrap();

        assert_eq!(fit.centroids.len(), 1);
        let c = fit.centroids[0];
        assert!((c[0] - 20.0).abs() < 1e-9);
        assert!((c[1] - 40.0).abs() < 1e-9);
        assert!((c[2] - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_separated_clusters() {
        let mut samples = vec![[0.0, 0.0, 0.0]; 20];
        samples.extend(vec![[200.0, 200.0, 200.0]; 20]);

        let fit = KMeans::new(2, 7).fit(&samples).unwrap();
        let mut firsts: Vec<f64> = fit.centroids.iter().map(|c| c[0]).collect();
        firsts.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert_eq!(firsts, vec![0.0, 200.0]);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_same_seed_same_fit() {
        let samples: Vec<[f64; 3]> = (0..100)
            .map(|i| [(i * 7 % 255) as f64, (i * 13 % 255) as f64, (i * 29 % 255) as f64])
            .collect();

        let a = KMeans::new(3, 42).fit(&samples).unwrap();
        let b = KMeans::new(3, 42).fit(&samples).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_samples() {
        assert!(KMeans::new(1, 42).fit(&[]).is_none());
    }
}
