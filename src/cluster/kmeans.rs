//! K-means clustering.
//!
//! Partitions data into k clusters by minimizing **within-cluster sum of squares**
//! (WCSS):
//!
//! ```text
//! WCSS = Σₖ Σᵢ∈Cₖ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Draw k distinct observations as initial centroids
//! 2. **Assign**: Each point → nearest centroid
//! 3. **Update**: Each centroid → mean of assigned points
//! 4. Repeat until no assignment changes or the iteration bound is hit
//!
//! WCSS never increases from one iteration to the next, so every run's
//! [`IterationRecord`] history is non-increasing.
//!
//! # Restarts
//!
//! Lloyd only finds a local minimum, so the whole run is repeated from
//! `restarts` independent initializations and the lowest-WCSS run wins
//! (ties go to the earliest restart). Restart `r` seeds its generator with
//! `seed + r`, which makes every fit reproducible.
//!
//! # Empty Clusters
//!
//! When an assignment step leaves a cluster empty, it takes the observation
//! farthest from its current centroid among clusters with more than one
//! member (ties: lowest observation index). Empty clusters are repaired in
//! ascending label order before centroids are recomputed, so every label in
//! `0..k` always has a member.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::assignment::ClusterAssignment;
use super::hierarchical::check_k;
use super::traits::Clustering;
use crate::distance::squared_euclidean;
use crate::error::{Error, Result};
use crate::table::NumericTable;

/// K-means clustering algorithm.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// Number of clusters.
    k: usize,
    /// Maximum assignment passes per restart.
    max_iter: usize,
    /// Independent initializations.
    restarts: usize,
    /// Base random seed.
    seed: u64,
}

/// Centroids and objective after one update step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Centroids after the update, one row per cluster.
    pub centroids: Array2<f64>,
    /// Total within-cluster sum of squares for these centroids.
    pub wcss: f64,
}

/// Result of a k-means fit: the winning restart, in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KmeansFit {
    /// Cluster label per observation.
    pub assignment: ClusterAssignment,
    /// Final centroids, one row per label.
    pub centroids: Array2<f64>,
    /// Centroids drawn at initialization.
    pub initial_centroids: Array2<f64>,
    /// Within-cluster sum of squares per label.
    pub withinss: Vec<f64>,
    /// Sum of `withinss`; the objective.
    pub tot_withinss: f64,
    /// Sum of squares about the grand mean.
    pub totss: f64,
    /// `totss - tot_withinss`.
    pub betweenss: f64,
    /// Observation count per label.
    pub sizes: Vec<usize>,
    /// Assignment passes performed.
    pub iterations: usize,
    /// Whether the last pass left every assignment unchanged.
    pub converged: bool,
    /// Index of the winning restart.
    pub restart: usize,
    /// One record per centroid update.
    pub history: Vec<IterationRecord>,
    /// Final objective of every restart, by restart index.
    pub restart_objectives: Vec<f64>,
}

struct Run {
    labels: Vec<usize>,
    centroids: Array2<f64>,
    initial_centroids: Array2<f64>,
    iterations: usize,
    converged: bool,
    history: Vec<IterationRecord>,
}

impl Run {
    fn objective(&self) -> f64 {
        self.history.last().map_or(f64::INFINITY, |r| r.wcss)
    }
}

impl Kmeans {
    /// Create a new K-means clusterer.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iter: 100,
            restarts: 10,
            seed: 0,
        }
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the number of independent initializations.
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub(crate) fn validate(&self, n: usize) -> Result<()> {
        check_k(self.k, n)?;
        if self.max_iter < 1 {
            return Err(Error::InvalidIteration(self.max_iter));
        }
        if self.restarts < 1 {
            return Err(Error::InvalidParameter {
                name: "restarts",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Run every restart and keep the one with the lowest WCSS.
    pub fn fit(&self, data: &NumericTable) -> Result<KmeansFit> {
        self.validate(data.n_observations())?;
        let x = data.data();

        #[cfg(feature = "parallel")]
        let runs: Vec<Run> = (0..self.restarts)
            .into_par_iter()
            .map(|r| self.run_once(x, r))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let runs: Vec<Run> = (0..self.restarts).map(|r| self.run_once(x, r)).collect();

        let restart_objectives: Vec<f64> = runs.iter().map(Run::objective).collect();
        let mut restart = 0;
        for (r, &obj) in restart_objectives.iter().enumerate() {
            if obj < restart_objectives[restart] {
                restart = r;
            }
        }
        let Some(best) = runs.into_iter().nth(restart) else {
            return Err(Error::EmptyInput);
        };

        let withinss = within_ss(x, &best.labels, &best.centroids);
        let tot_withinss = withinss.iter().sum::<f64>();
        let totss = total_ss(x);
        let assignment = ClusterAssignment::from_labels(best.labels)?;

        debug!(
            k = self.k,
            restart,
            tot_withinss,
            iterations = best.iterations,
            "k-means fit selected"
        );

        Ok(KmeansFit {
            sizes: assignment.sizes(),
            assignment,
            centroids: best.centroids,
            initial_centroids: best.initial_centroids,
            withinss,
            tot_withinss,
            totss,
            betweenss: totss - tot_withinss,
            iterations: best.iterations,
            converged: best.converged,
            restart,
            history: best.history,
            restart_objectives,
        })
    }

    fn run_once(&self, x: &Array2<f64>, restart: usize) -> Run {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(restart as u64));
        let picks = rand::seq::index::sample(&mut rng, n, self.k);

        let mut initial_centroids = Array2::zeros((self.k, x.ncols()));
        for (c, i) in picks.iter().enumerate() {
            initial_centroids.row_mut(c).assign(&x.row(i));
        }

        let mut labels = assign(x, &initial_centroids);
        repair_empty(x, &initial_centroids, &mut labels, self.k);
        let mut centroids = update_centroids(x, &labels, self.k);
        let mut history = vec![IterationRecord {
            wcss: wcss(x, &labels, &centroids),
            centroids: centroids.clone(),
        }];
        let mut iterations = 1;
        let mut converged = false;

        while iterations < self.max_iter {
            let mut next = assign(x, &centroids);
            repair_empty(x, &centroids, &mut next, self.k);
            iterations += 1;
            if next == labels {
                converged = true;
                break;
            }
            labels = next;
            centroids = update_centroids(x, &labels, self.k);
            let obj = wcss(x, &labels, &centroids);
            trace!(restart, iteration = iterations, wcss = obj, "k-means update");
            history.push(IterationRecord {
                centroids: centroids.clone(),
                wcss: obj,
            });
        }

        if !converged {
            warn!(
                restart,
                max_iter = self.max_iter,
                "k-means reached the iteration bound before assignments settled"
            );
        }

        Run {
            labels,
            centroids,
            initial_centroids,
            iterations,
            converged,
            history,
        }
    }
}

impl Clustering for Kmeans {
    fn fit_predict(&self, data: &NumericTable) -> Result<ClusterAssignment> {
        Ok(self.fit(data)?.assignment)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Run k-means with explicit parameters.
pub fn cluster_kmeans(
    data: &NumericTable,
    k: usize,
    restarts: usize,
    max_iterations: usize,
    seed: u64,
) -> Result<KmeansFit> {
    Kmeans::new(k)
        .with_restarts(restarts)
        .with_max_iter(max_iterations)
        .with_seed(seed)
        .fit(data)
}

fn nearest(point: ndarray::ArrayView1<'_, f64>, centroids: &Array2<f64>) -> usize {
    let mut best_cluster = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.outer_iter().enumerate() {
        let dist = squared_euclidean(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = c;
        }
    }
    best_cluster
}

/// Assignment step. Ties go to the lowest centroid index.
fn assign(x: &Array2<f64>, centroids: &Array2<f64>) -> Vec<usize> {
    let mut labels = vec![0usize; x.nrows()];

    #[cfg(feature = "parallel")]
    {
        labels
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, label)| *label = nearest(x.row(i), centroids));
    }

    #[cfg(not(feature = "parallel"))]
    for (i, label) in labels.iter_mut().enumerate() {
        *label = nearest(x.row(i), centroids);
    }

    labels
}

fn repair_empty(x: &Array2<f64>, centroids: &Array2<f64>, labels: &mut [usize], k: usize) {
    let mut counts = vec![0usize; k];
    for &l in labels.iter() {
        counts[l] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        let mut donor: Option<(usize, f64)> = None;
        for (i, &l) in labels.iter().enumerate() {
            if counts[l] < 2 {
                continue;
            }
            let d = squared_euclidean(x.row(i), centroids.row(l));
            if donor.map_or(true, |(_, best)| d > best) {
                donor = Some((i, d));
            }
        }
        // n >= k guarantees a cluster with two members while one is empty.
        if let Some((i, _)) = donor {
            debug!(cluster = empty, observation = i, "re-seeded empty k-means cluster");
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
        }
    }
}

fn update_centroids(x: &Array2<f64>, labels: &[usize], k: usize) -> Array2<f64> {
    let mut centroids = Array2::zeros((k, x.ncols()));
    let mut counts = vec![0usize; k];
    for (row, &l) in x.outer_iter().zip(labels) {
        let mut c = centroids.row_mut(l);
        c += &row;
        counts[l] += 1;
    }
    for (mut c, &count) in centroids.outer_iter_mut().zip(&counts) {
        if count > 0 {
            c /= count as f64;
        }
    }
    centroids
}

fn within_ss(x: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> Vec<f64> {
    let mut out = vec![0.0; centroids.nrows()];
    for (row, &l) in x.outer_iter().zip(labels) {
        out[l] += squared_euclidean(row, centroids.row(l));
    }
    out
}

fn wcss(x: &Array2<f64>, labels: &[usize], centroids: &Array2<f64>) -> f64 {
    within_ss(x, labels, centroids).iter().sum()
}

fn total_ss(x: &Array2<f64>) -> f64 {
    let Some(mean) = x.mean_axis(Axis(0)) else {
        return 0.0;
    };
    x.outer_iter()
        .map(|row| squared_euclidean(row, mean.view()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[[f64; 2]]) -> NumericTable {
        NumericTable::from_rows(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    fn two_blobs() -> NumericTable {
        table(&[[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]])
    }

    #[test]
    fn test_kmeans_basic() {
        let labels = Kmeans::new(2).with_seed(42).fit_predict(&two_blobs()).unwrap();
        let labels = labels.labels();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64 * 0.1, (i % 5) as f64])
            .collect();
        let data = NumericTable::from_rows(&rows).unwrap();

        let fit = Kmeans::new(5).with_seed(123).fit(&data).unwrap();

        assert_eq!(fit.assignment.len(), 50);
        assert_eq!(fit.assignment.n_clusters(), 5);
        assert_eq!(fit.sizes.iter().sum::<usize>(), 50);
        assert!(fit.sizes.iter().all(|&s| s > 0));
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        let data = table(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
        let fit = Kmeans::new(3).with_seed(42).fit(&data).unwrap();

        assert_eq!(fit.assignment.n_clusters(), 3);
        assert_eq!(fit.tot_withinss, 0.0);
    }

    #[test]
    fn test_duplicate_points_never_leave_a_cluster_empty() {
        // Only two distinct positions but k = 3.
        let data = table(&[[0.0, 0.0], [0.0, 0.0], [0.0, 0.0], [5.0, 5.0], [5.0, 5.0]]);
        for seed in 0..20 {
            let fit = Kmeans::new(3).with_seed(seed).with_restarts(1).fit(&data).unwrap();
            assert!(fit.sizes.iter().all(|&s| s > 0), "seed {seed}: {:?}", fit.sizes);
            assert_eq!(fit.tot_withinss, 0.0);
        }
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![((i * 7) % 13) as f64, ((i * 3) % 11) as f64])
            .collect();
        let data = NumericTable::from_rows(&rows).unwrap();

        let a = cluster_kmeans(&data, 4, 5, 50, 9).unwrap();
        let b = cluster_kmeans(&data, 4, 5, 50, 9).unwrap();
        assert_eq!(a, b, "same seed should give same result");
    }

    #[test]
    fn test_history_is_non_increasing() {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let t = i as f64;
                vec![(t * 0.37).sin() * 4.0 + (i % 3) as f64 * 6.0, (t * 0.11).cos()]
            })
            .collect();
        let data = NumericTable::from_rows(&rows).unwrap();

        let fit = Kmeans::new(3).with_seed(1).with_restarts(4).fit(&data).unwrap();
        for w in fit.history.windows(2) {
            assert!(w[1].wcss <= w[0].wcss + 1e-9, "{} -> {}", w[0].wcss, w[1].wcss);
        }
        assert!((fit.history.last().unwrap().wcss - fit.tot_withinss).abs() < 1e-9);
    }

    #[test]
    fn test_best_restart_is_minimum() {
        let rows: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![(i % 6) as f64 * 3.0, (i / 6) as f64])
            .collect();
        let data = NumericTable::from_rows(&rows).unwrap();
        let fit = Kmeans::new(4).with_seed(3).with_restarts(6).fit(&data).unwrap();

        assert_eq!(fit.restart_objectives.len(), 6);
        let min = fit
            .restart_objectives
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        assert_eq!(fit.tot_withinss, min);
        assert_eq!(fit.restart_objectives[fit.restart], min);
        assert!((fit.totss - fit.tot_withinss - fit.betweenss).abs() < 1e-9);
    }

    #[test]
    fn test_iteration_bound_is_respected() {
        let rows: Vec<Vec<f64>> = (0..25).map(|i| vec![i as f64, (i * i % 7) as f64]).collect();
        let data = NumericTable::from_rows(&rows).unwrap();
        let fit = Kmeans::new(3).with_max_iter(1).fit(&data).unwrap();

        assert_eq!(fit.iterations, 1);
        assert!(!fit.converged);
        assert_eq!(fit.history.len(), 1);
    }

    #[test]
    fn test_kmeans_parameter_errors() {
        let data = two_blobs();
        assert!(matches!(
            Kmeans::new(0).fit(&data),
            Err(Error::InvalidK { requested: 0, .. })
        ));
        assert!(matches!(
            Kmeans::new(5).fit(&data),
            Err(Error::InvalidK { requested: 5, n_items: 4 })
        ));
        assert_eq!(
            Kmeans::new(2).with_max_iter(0).fit(&data).unwrap_err(),
            Error::InvalidIteration(0)
        );
        assert!(matches!(
            Kmeans::new(2).with_restarts(0).fit(&data),
            Err(Error::InvalidParameter { name: "restarts", .. })
        ));
    }

    #[test]
    fn test_kmeans_empty_input_error() {
        let data = NumericTable::from_rows(&[]).unwrap();
        assert!(Kmeans::new(1).fit(&data).is_err());
    }
}
