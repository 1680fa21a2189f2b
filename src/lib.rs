//! # sift
//!
//! Group tabular observations into clusters and describe each cluster.
//!
//! The pipeline is four pure steps, each usable on its own:
//!
//! 1. [`select_numeric`]: project an [`ObservationTable`] onto numeric columns
//! 2. [`compute_distances`]: Euclidean [`DistanceMatrix`]
//! 3. [`cluster_hierarchical`] or [`cluster_kmeans`]: a [`ClusterAssignment`]
//! 4. [`summarize`]: count, mean and standard deviation per cluster
//!
//! [`ClusterSummarizer`] runs all four behind one validated call. Every
//! intermediate result is plain data: the [`Dendrogram`] can be re-cut at any
//! k, and a [`KmeansFit`] carries its centroid and objective history.
//!
//! ```rust
//! use sift::{ClusterSummarizer, Linkage, ObservationTable};
//!
//! let mut table = ObservationTable::new(["x", "y"]).unwrap();
//! for (x, y) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (10.0, 10.0), (10.0, 11.0), (11.0, 10.0)] {
//!     table.push(vec![x.into(), y.into()]).unwrap();
//! }
//!
//! let run = ClusterSummarizer::new(["x", "y"])
//!     .with_k(2)
//!     .with_linkage(Linkage::Complete)
//!     .run(&table)
//!     .unwrap();
//!
//! assert_eq!(run.summaries.len(), 2);
//! assert_eq!(run.summaries[0].count, 3);
//! ```
//!
//! Enable the `parallel` feature to run k-means restarts on the rayon pool;
//! results are identical either way.

pub mod cluster;
pub mod distance;
/// Error types used across `sift`.
pub mod error;
pub mod metrics;
pub mod summarize;
pub mod table;

pub use cluster::{
    cluster_hierarchical, cluster_kmeans, ClusterAssignment, Clustering, Dendrogram,
    HierarchicalClustering, Kmeans, KmeansFit, Linkage,
};
pub use distance::{compute_distances, DistanceMatrix};
pub use error::{Error, Result};
pub use metrics::{ari, silhouette, within_cluster_sum_of_squares};
pub use summarize::{
    summarize, ClusterSummarizer, ClusterSummary, ClusteringRun, ColumnStats, Method,
    SummarizerConfig,
};
pub use table::{select_numeric, NumericTable, ObservationTable, Value};
