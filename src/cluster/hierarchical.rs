//! Hierarchical (agglomerative) clustering.
//!
//! Bottom-up clustering that builds a **dendrogram** by iteratively
//! merging the closest clusters. Unlike K-means, you don't need to fix k
//! to build the tree: cut it afterwards at any number of clusters.
//!
//! # Linkage Methods
//!
//! | Linkage | Formula | Effect |
//! |---------|---------|--------|
//! | Single | min(d(a,b)) for a∈A, b∈B | Chaining; elongated clusters |
//! | Complete | max(d(a,b)) | Compact, spherical clusters |
//! | Average | mean(d(a,b)) | Balanced compromise |
//! | Centroid | ‖μₐ - μᵦ‖ | Can produce inversions |
//!
//! All four are maintained with the Lance–Williams recurrence, so only the
//! distance matrix is needed. Centroid linkage runs on squared distances,
//! where the recurrence is exact for Euclidean input:
//!
//! ```text
//! d²(k, A∪B) = nₐ/n · d²(k, A) + nᵦ/n · d²(k, B) - nₐnᵦ/n² · d²(A, B)
//! ```
//!
//! # Ties
//!
//! When several pairs share the smallest distance, the pair whose
//! (smaller id, larger id) is lexicographically smallest merges first.
//! Ids follow [`Dendrogram`]: leaves `0..n`, merge `i` creates `n + i`.
//!
//! Time is O(n³) and space O(n²); this is meant for the table sizes of
//! exploratory analysis.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::assignment::ClusterAssignment;
use super::dendrogram::Dendrogram;
use super::traits::Clustering;
use crate::distance::{compute_distances, DistanceMatrix};
use crate::error::{Error, Result};
use crate::table::NumericTable;

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    #[default]
    Complete,
    /// Average linkage: mean pairwise distance between clusters.
    Average,
    /// Centroid linkage: distance between cluster centroids.
    Centroid,
}

#[derive(Debug, Clone, Copy)]
struct Active {
    id: usize,
    slot: usize,
    size: usize,
}

/// Build the full merge tree from a distance matrix.
pub fn build_dendrogram(distances: &DistanceMatrix, linkage: Linkage) -> Result<Dendrogram> {
    let n = distances.len();
    if n == 0 {
        return Err(Error::EmptyInput);
    }

    let squared = linkage == Linkage::Centroid;
    let mut work = distances.as_array().clone();
    if squared {
        work.mapv_inplace(|d| d * d);
    }

    // Kept sorted by id: new clusters get the largest id so far and are
    // appended, removals preserve order.
    let mut active: Vec<Active> = (0..n).map(|i| Active { id: i, slot: i, size: 1 }).collect();
    let mut dendro = Dendrogram::new(n);

    for step in 0..n - 1 {
        let mut best: Option<(usize, usize, f64)> = None;
        for p in 0..active.len() {
            for q in (p + 1)..active.len() {
                let d = work[[active[p].slot, active[q].slot]];
                if best.map_or(true, |(_, _, b)| d < b) {
                    best = Some((p, q, d));
                }
            }
        }
        let Some((p, q, d)) = best else {
            break;
        };

        let a = active[p];
        let b = active[q];
        let size = a.size + b.size;
        let (na, nb, nab) = (a.size as f64, b.size as f64, size as f64);

        for r in active.iter().filter(|r| r.slot != a.slot && r.slot != b.slot) {
            let da = work[[a.slot, r.slot]];
            let db = work[[b.slot, r.slot]];
            let merged = match linkage {
                Linkage::Single => da.min(db),
                Linkage::Complete => da.max(db),
                Linkage::Average => (na * da + nb * db) / nab,
                Linkage::Centroid => {
                    ((na * da + nb * db) / nab - na * nb * d / (nab * nab)).max(0.0)
                }
            };
            work[[a.slot, r.slot]] = merged;
            work[[r.slot, a.slot]] = merged;
        }

        let height = if squared { d.max(0.0).sqrt() } else { d };
        dendro.add_merge(a.id, b.id, height, size);

        active.remove(q);
        active.remove(p);
        active.push(Active {
            id: n + step,
            slot: a.slot,
            size,
        });
    }

    debug!(n, ?linkage, merges = dendro.n_merges(), "built dendrogram");
    Ok(dendro)
}

/// Cluster from a distance matrix and cut to `k` clusters.
///
/// `k` is checked against the matrix size before any merging starts.
pub fn cluster_hierarchical(
    distances: &DistanceMatrix,
    linkage: Linkage,
    k: usize,
) -> Result<ClusterAssignment> {
    check_k(k, distances.len())?;
    build_dendrogram(distances, linkage)?.cut_to_k(k)
}

pub(crate) fn check_k(k: usize, n: usize) -> Result<()> {
    if k == 0 || k > n {
        return Err(Error::InvalidK {
            requested: k,
            n_items: n,
        });
    }
    Ok(())
}

/// Hierarchical (agglomerative) clustering.
#[derive(Debug, Clone)]
pub struct HierarchicalClustering {
    /// Number of clusters to produce.
    n_clusters: usize,
    /// Linkage method.
    linkage: Linkage,
}

impl HierarchicalClustering {
    /// Create a new hierarchical clusterer with complete linkage.
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            linkage: Linkage::default(),
        }
    }

    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Linkage in use.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Fit and return the full dendrogram.
    pub fn fit_dendrogram(&self, data: &NumericTable) -> Result<Dendrogram> {
        build_dendrogram(&compute_distances(data), self.linkage)
    }
}

impl Clustering for HierarchicalClustering {
    fn fit_predict(&self, data: &NumericTable) -> Result<ClusterAssignment> {
        check_k(self.n_clusters, data.n_observations())?;
        self.fit_dendrogram(data)?.cut_to_k(self.n_clusters)
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }
}
