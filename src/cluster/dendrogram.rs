//! Dendrogram produced by agglomerative clustering.
//!
//! A dendrogram is the full merge history, from `n` singletons down to one
//! cluster. It is plain data: any partition can be read back from it by
//! replaying a prefix of the merges.
//!
//! Cluster ids follow the SciPy/MATLAB convention: leaves are `0..n`, and
//! merge `i` creates cluster `n + i`.

use serde::{Deserialize, Serialize};

use super::assignment::ClusterAssignment;
use crate::error::{Error, Result};

/// A dendrogram representing hierarchical cluster merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDendrogram")]
pub struct Dendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

#[derive(Deserialize)]
struct RawDendrogram {
    merges: Vec<Merge>,
    n_items: usize,
}

impl TryFrom<RawDendrogram> for Dendrogram {
    type Error = Error;

    fn try_from(raw: RawDendrogram) -> Result<Self> {
        Self::from_merges(raw.n_items, raw.merges)
    }
}

/// A single merge operation in the dendrogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Smaller id of the two clusters merged.
    pub cluster_a: usize,
    /// Larger id of the two clusters merged.
    pub cluster_b: usize,
    /// Linkage distance at which the merge occurred.
    pub distance: f64,
    /// Size of the resulting cluster.
    pub size: usize,
}

impl Dendrogram {
    /// Create an empty dendrogram over `n_items` leaves.
    pub fn new(n_items: usize) -> Self {
        Self {
            merges: Vec::with_capacity(n_items.saturating_sub(1)),
            n_items,
        }
    }

    /// Rebuild a dendrogram from a stored merge list.
    ///
    /// Merge `i` may only join two distinct clusters that exist before it
    /// (ids below `n_items + i`) and that no earlier merge has consumed.
    pub fn from_merges(n_items: usize, merges: Vec<Merge>) -> Result<Self> {
        if merges.len() > n_items.saturating_sub(1) {
            return Err(Error::InvalidParameter {
                name: "merges",
                message: "more merges than a tree over n_items allows",
            });
        }
        let mut consumed = vec![false; n_items + merges.len()];
        for (i, m) in merges.iter().enumerate() {
            let limit = n_items + i;
            if m.cluster_a >= limit || m.cluster_b >= limit || m.cluster_a == m.cluster_b {
                return Err(Error::InvalidParameter {
                    name: "merges",
                    message: "merge refers to a cluster that does not exist yet",
                });
            }
            if consumed[m.cluster_a] || consumed[m.cluster_b] {
                return Err(Error::InvalidParameter {
                    name: "merges",
                    message: "cluster merged more than once",
                });
            }
            consumed[m.cluster_a] = true;
            consumed[m.cluster_b] = true;
        }
        Ok(Self { merges, n_items })
    }

    /// Record a merge operation.
    pub fn add_merge(&mut self, cluster_a: usize, cluster_b: usize, distance: f64, size: usize) {
        self.merges.push(Merge {
            cluster_a,
            cluster_b,
            distance,
            size,
        });
    }

    /// Partition into exactly `k` clusters by replaying the first `n - k`
    /// merges.
    ///
    /// Labels are numbered by first appearance in observation order.
    pub fn cut_to_k(&self, k: usize) -> Result<ClusterAssignment> {
        if k == 0 || k > self.n_items {
            return Err(Error::InvalidK {
                requested: k,
                n_items: self.n_items,
            });
        }
        let applied = self.n_items - k;
        if applied > self.merges.len() {
            return Err(Error::InvalidParameter {
                name: "k",
                message: "dendrogram has too few merges for this cut",
            });
        }
        Ok(self.replay(applied))
    }

    /// Partition by applying merges, in order, while their distance is at
    /// most `threshold`.
    ///
    /// Replay stops at the first merge above the threshold, so a later merge
    /// with a smaller height (possible under centroid linkage) is never
    /// applied on its own.
    pub fn cut_at_distance(&self, threshold: f64) -> ClusterAssignment {
        let applied = self
            .merges
            .iter()
            .position(|m| m.distance > threshold)
            .unwrap_or(self.merges.len());
        self.replay(applied)
    }

    fn replay(&self, applied: usize) -> ClusterAssignment {
        let n = self.n_items;
        let mut parent: Vec<usize> = (0..n + applied).collect();
        for (i, merge) in self.merges.iter().take(applied).enumerate() {
            parent[merge.cluster_a] = n + i;
            parent[merge.cluster_b] = n + i;
        }

        let roots: Vec<usize> = (0..n)
            .map(|leaf| {
                let mut id = leaf;
                while parent[id] != id {
                    id = parent[id];
                }
                id
            })
            .collect();

        ClusterAssignment::relabel_by_first_appearance(&roots)
    }

    /// Leaf order for drawing: a depth-first walk from each root, visiting
    /// `cluster_a` before `cluster_b`, with roots taken by ascending id.
    pub fn order(&self) -> Vec<usize> {
        let n = self.n_items;
        let total = n + self.merges.len();
        let mut is_child = vec![false; total];
        for m in &self.merges {
            is_child[m.cluster_a] = true;
            is_child[m.cluster_b] = true;
        }

        let mut out = Vec::with_capacity(n);
        for root in (0..total).filter(|&id| !is_child[id]) {
            let mut stack = vec![root];
            while let Some(id) = stack.pop() {
                if id < n {
                    out.push(id);
                } else {
                    let m = &self.merges[id - n];
                    stack.push(m.cluster_b);
                    stack.push(m.cluster_a);
                }
            }
        }
        out
    }

    /// Whether merge heights never decrease.
    ///
    /// Single, complete and average linkage always give a monotone tree;
    /// centroid linkage can produce inversions.
    pub fn is_monotone(&self) -> bool {
        self.merges.windows(2).all(|w| w[0].distance <= w[1].distance)
    }

    /// Number of original items.
    pub fn n_items(&self) -> usize {
        self.n_items
    }

    /// Number of merges recorded.
    pub fn n_merges(&self) -> usize {
        self.merges.len()
    }

    /// Iterate over merges.
    pub fn merges(&self) -> impl Iterator<Item = &Merge> {
        self.merges.iter()
    }

    /// Merge heights in merge order.
    pub fn heights(&self) -> Vec<f64> {
        self.merges.iter().map(|m| m.distance).collect()
    }
}
