//! Clustering algorithms for grouping observations.
//!
//! Two interchangeable strategies, both behind the [`Clustering`] trait and
//! both producing a [`ClusterAssignment`] whose labels cover `0..k`.
//!
//! ## Algorithms
//!
//! ### K-means
//!
//! The classic algorithm: assign each point to the nearest centroid, then
//! update centroids to the mean of their points. Repeat.
//!
//! **Objective**: Minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! **Assumptions**:
//! - Clusters are roughly spherical
//! - Clusters have similar sizes
//! - You know k in advance
//!
//! The full run is returned as a [`KmeansFit`]: centroid and objective
//! history per iteration, objective per restart, sums of squares.
//!
//! ### Hierarchical (Agglomerative) Clustering
//!
//! Bottom-up: start with each point as its own cluster, repeatedly merge
//! the two closest clusters until one remains. The merge history forms a
//! [`Dendrogram`], a binary tree you can cut at any k.
//!
//! | Linkage | Distance | Effect |
//! |---------|----------|--------|
//! | Single | min(pairwise) | Chaining; elongated clusters |
//! | Complete | max(pairwise) | Compact, spherical clusters |
//! | Average | mean(pairwise) | Balanced compromise |
//! | Centroid | between means | Intuitive, but heights can invert |
//!
//! ## Usage
//!
//! ```rust
//! use sift::cluster::{Clustering, HierarchicalClustering, Kmeans, Linkage};
//! use sift::table::NumericTable;
//!
//! let data = NumericTable::from_rows(&[
//!     vec![0.0, 0.0],
//!     vec![0.1, 0.1],
//!     vec![10.0, 10.0],
//!     vec![10.1, 10.1],
//! ])
//! .unwrap();
//!
//! let labels = Kmeans::new(2).with_seed(7).fit_predict(&data).unwrap();
//! assert_eq!(labels.label(0), labels.label(1));
//! assert_ne!(labels.label(0), labels.label(2));
//!
//! let hc = HierarchicalClustering::new(2).with_linkage(Linkage::Average);
//! assert_eq!(hc.fit_predict(&data).unwrap().labels(), [0, 0, 1, 1]);
//! ```

mod assignment;
mod dendrogram;
mod hierarchical;
mod kmeans;
mod traits;

pub use assignment::ClusterAssignment;
pub use dendrogram::{Dendrogram, Merge};
pub(crate) use hierarchical::check_k;
pub use hierarchical::{build_dendrogram, cluster_hierarchical, HierarchicalClustering, Linkage};
pub use kmeans::{cluster_kmeans, IterationRecord, Kmeans, KmeansFit};
pub use traits::Clustering;
