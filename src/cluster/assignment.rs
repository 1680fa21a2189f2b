use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Cluster label per observation.
///
/// Labels always cover exactly `0..n_clusters()`: every label in that range
/// is carried by at least one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct ClusterAssignment {
    labels: Vec<usize>,
    n_clusters: usize,
}

impl ClusterAssignment {
    /// Validate and wrap raw labels.
    pub fn from_labels(labels: Vec<usize>) -> Result<Self> {
        // Contiguous labels over n observations are all below n.
        let n = labels.len();
        let mut seen = vec![false; n];
        for &l in labels.iter().filter(|&&l| l < n) {
            seen[l] = true;
        }
        let n_clusters = seen.iter().position(|s| !s).unwrap_or(n);
        if labels.iter().any(|&l| l >= n_clusters) {
            return Err(Error::NonContiguousLabels {
                missing: n_clusters,
            });
        }
        Ok(Self { labels, n_clusters })
    }

    /// Renumber arbitrary cluster ids by order of first appearance, so
    /// observation 0 always lands in cluster 0.
    pub(crate) fn relabel_by_first_appearance(raw: &[usize]) -> Self {
        let mut map = std::collections::HashMap::new();
        let labels = raw
            .iter()
            .map(|&id| {
                let next = map.len();
                *map.entry(id).or_insert(next)
            })
            .collect();
        Self {
            labels,
            n_clusters: map.len(),
        }
    }

    /// Labels in observation order.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Label of observation `i`.
    pub fn label(&self, i: usize) -> Option<usize> {
        self.labels.get(i).copied()
    }

    /// Number of distinct clusters.
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether no observation is assigned.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Observation indices carrying `label`, ascending.
    pub fn members(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Observation count per cluster, indexed by label.
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for &l in &self.labels {
            sizes[l] += 1;
        }
        sizes
    }
}

impl TryFrom<Vec<usize>> for ClusterAssignment {
    type Error = Error;

    fn try_from(labels: Vec<usize>) -> Result<Self> {
        Self::from_labels(labels)
    }
}

impl From<ClusterAssignment> for Vec<usize> {
    fn from(a: ClusterAssignment) -> Self {
        a.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_labels_rejects_gaps() {
        assert!(ClusterAssignment::from_labels(vec![0, 1, 1, 2]).is_ok());
        assert_eq!(
            ClusterAssignment::from_labels(vec![0, 2, 2]).unwrap_err(),
            Error::NonContiguousLabels { missing: 1 }
        );
    }

    #[test]
    fn test_relabel_by_first_appearance() {
        let a = ClusterAssignment::relabel_by_first_appearance(&[9, 4, 9, 7]);
        assert_eq!(a.labels(), [0, 1, 0, 2]);
        assert_eq!(a.n_clusters(), 3);
        assert_eq!(a.sizes(), vec![2, 1, 1]);
        assert_eq!(a.members(0), vec![0, 2]);
    }

    #[test]
    fn test_deserialize_validates() {
        let a: ClusterAssignment = serde_json::from_str("[1, 0, 1]").unwrap();
        assert_eq!(a.n_clusters(), 2);
        assert!(serde_json::from_str::<ClusterAssignment>("[0, 3]").is_err());
    }

    #[test]
    fn test_huge_labels_are_rejected() {
        assert_eq!(
            ClusterAssignment::from_labels(vec![usize::MAX]).unwrap_err(),
            Error::NonContiguousLabels { missing: 0 }
        );
        assert_eq!(
            ClusterAssignment::from_labels(vec![0, 1_000_000_000_000]).unwrap_err(),
            Error::NonContiguousLabels { missing: 1 }
        );
        assert!(
            serde_json::from_str::<ClusterAssignment>("[18446744073709551615]").is_err()
        );
    }
}
