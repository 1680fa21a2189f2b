//! Partition quality measures.
//!
//! | Measure | Range | Best | Needs |
//! |---------|-------|------|-------|
//! | [`within_cluster_sum_of_squares`] | [0, ∞) | low | coordinates |
//! | [`silhouette`] | [-1, 1] | 1 | distance matrix |
//! | [`ari`] | [-1, 1] | 1 | a second labelling |
//!
//! WCSS always falls as k grows, so compare it across k by looking for the
//! elbow. Silhouette width can be compared across k directly. ARI compares
//! two partitions of the same observations without caring how either one
//! numbers its clusters, which makes it the natural check that hierarchical
//! and k-means runs agree.
//!
//! # References
//!
//! - Rousseeuw (1987). "Silhouettes: a graphical aid to the interpretation
//!   and validation of cluster analysis"
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)

use std::collections::HashMap;

use crate::cluster::ClusterAssignment;
use crate::distance::{squared_euclidean, DistanceMatrix};
use crate::error::{Error, Result};
use crate::table::NumericTable;

fn check_len(expected: usize, assignment: &ClusterAssignment) -> Result<()> {
    if assignment.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            found: assignment.len(),
        });
    }
    Ok(())
}

/// Sum over observations of the squared distance to their cluster mean.
pub fn within_cluster_sum_of_squares(
    data: &NumericTable,
    assignment: &ClusterAssignment,
) -> Result<f64> {
    check_len(data.n_observations(), assignment)?;

    let d = data.n_features();
    let k = assignment.n_clusters();
    let mut sums = ndarray::Array2::<f64>::zeros((k, d));
    let sizes = assignment.sizes();
    for (row, &l) in data.data().outer_iter().zip(assignment.labels()) {
        let mut s = sums.row_mut(l);
        s += &row;
    }
    for (mut s, &size) in sums.outer_iter_mut().zip(&sizes) {
        s /= size as f64;
    }

    Ok(data
        .data()
        .outer_iter()
        .zip(assignment.labels())
        .map(|(row, &l)| squared_euclidean(row, sums.row(l)))
        .sum())
}

/// Mean silhouette width.
///
/// For observation i with mean distance `a` to its own cluster and smallest
/// mean distance `b` to any other cluster, `s(i) = (b - a) / max(a, b)`.
/// Members of singleton clusters score 0.
pub fn silhouette(distances: &DistanceMatrix, assignment: &ClusterAssignment) -> Result<f64> {
    check_len(distances.len(), assignment)?;
    let k = assignment.n_clusters();
    if k < 2 {
        return Err(Error::InvalidParameter {
            name: "assignment",
            message: "silhouette needs at least two clusters",
        });
    }

    let labels = assignment.labels();
    let sizes = assignment.sizes();
    let n = labels.len();

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] < 2 {
            continue;
        }
        let mut sum_to = vec![0.0; k];
        for j in 0..n {
            sum_to[labels[j]] += distances.get(i, j);
        }
        let a = sum_to[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own)
            .map(|c| sum_to[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let m = a.max(b);
        if m > 0.0 {
            total += (b - a) / m;
        }
    }
    Ok(total / n as f64)
}

/// Adjusted Rand Index between two labellings of the same observations.
///
/// 1 means identical partitions (whatever the label numbering), values near
/// 0 mean chance-level agreement. Returns 0.0 when the lengths differ or the
/// input is empty.
///
/// ```rust
/// use sift::metrics::ari;
///
/// assert!((ari(&[0, 0, 1, 1], &[1, 1, 0, 0]) - 1.0).abs() < 1e-12);
/// ```
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
    for (&p, &t) in pred.iter().zip(truth) {
        *joint.entry((p, t)).or_insert(0) += 1;
    }

    let mut row_sums: HashMap<usize, usize> = HashMap::new();
    let mut col_sums: HashMap<usize, usize> = HashMap::new();
    for (&(p, t), &count) in &joint {
        *row_sums.entry(p).or_insert(0) += count;
        *col_sums.entry(t).or_insert(0) += count;
    }

    let sum_comb_ij: f64 = joint.values().map(|&c| comb2(c)).sum();
    let sum_comb_a: f64 = row_sums.values().map(|&a| comb2(a)).sum();
    let sum_comb_b: f64 = col_sums.values().map(|&b| comb2(b)).sum();
    let comb_n = comb2(pred.len());

    let expected = if comb_n > 0.0 {
        sum_comb_a * sum_comb_b / comb_n
    } else {
        0.0
    };
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    let denom = max_index - expected;
    if denom.abs() < 1e-10 {
        // Both labellings trivial (all-one or all-singleton) and equal.
        return if pred_partition_eq(pred, truth) { 1.0 } else { 0.0 };
    }
    (sum_comb_ij - expected) / denom
}

fn pred_partition_eq(a: &[usize], b: &[usize]) -> bool {
    ClusterAssignment::relabel_by_first_appearance(a)
        == ClusterAssignment::relabel_by_first_appearance(b)
}

fn comb2(n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        (n * (n - 1) / 2) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::compute_distances;

    fn line() -> NumericTable {
        NumericTable::from_rows(&[vec![0.0], vec![1.0], vec![10.0], vec![11.0]]).unwrap()
    }

    #[test]
    fn test_wcss_hand_computed() {
        let a = ClusterAssignment::from_labels(vec![0, 0, 1, 1]).unwrap();
        // Each pair sits 0.5 from its mean: 4 × 0.25.
        assert_eq!(within_cluster_sum_of_squares(&line(), &a).unwrap(), 1.0);
    }

    #[test]
    fn test_silhouette_prefers_true_split() {
        let dm = compute_distances(&line());
        let good = ClusterAssignment::from_labels(vec![0, 0, 1, 1]).unwrap();
        let bad = ClusterAssignment::from_labels(vec![0, 1, 0, 1]).unwrap();

        let s_good = silhouette(&dm, &good).unwrap();
        let s_bad = silhouette(&dm, &bad).unwrap();
        assert!(s_good > 0.8, "{s_good}");
        assert!(s_bad < 0.0, "{s_bad}");
        assert!((-1.0..=1.0).contains(&s_bad));
    }

    #[test]
    fn test_silhouette_needs_two_clusters() {
        let dm = compute_distances(&line());
        let one = ClusterAssignment::from_labels(vec![0; 4]).unwrap();
        assert!(silhouette(&dm, &one).is_err());
    }

    #[test]
    fn test_ari_permutation_invariant() {
        assert!((ari(&[0, 0, 1, 1, 2], &[2, 2, 0, 0, 1]) - 1.0).abs() < 1e-12);
        assert!(ari(&[0, 1, 0, 1], &[0, 0, 1, 1]) < 0.01);
        assert_eq!(ari(&[0, 0, 0], &[0, 0, 0]), 1.0);
        assert_eq!(ari(&[0, 1], &[0]), 0.0);
    }
}
