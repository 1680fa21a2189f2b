//! Clustering traits.

use super::assignment::ClusterAssignment;
use crate::error::Result;
use crate::table::NumericTable;

/// Trait for hard clustering algorithms.
pub trait Clustering {
    /// Fit the model to data and return cluster assignments.
    ///
    /// Returns one label per observation, contiguous from 0.
    fn fit_predict(&self, data: &NumericTable) -> Result<ClusterAssignment>;

    /// Get the number of clusters.
    fn n_clusters(&self) -> usize;
}
