//! Pairwise Euclidean distances between observations.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::table::NumericTable;

/// Symmetric `n × n` matrix of pairwise distances with a zero diagonal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDistanceMatrix")]
pub struct DistanceMatrix {
    data: Array2<f64>,
}

#[derive(Deserialize)]
struct RawDistanceMatrix {
    data: Array2<f64>,
}

impl TryFrom<RawDistanceMatrix> for DistanceMatrix {
    type Error = Error;

    fn try_from(raw: RawDistanceMatrix) -> Result<Self> {
        Self::from_array(raw.data)
    }
}

impl DistanceMatrix {
    /// Wrap a precomputed dissimilarity matrix.
    ///
    /// The matrix must be square, symmetric, finite, non-negative and have a
    /// zero diagonal.
    pub fn from_array(data: Array2<f64>) -> Result<Self> {
        let n = data.nrows();
        if data.ncols() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                found: data.ncols(),
            });
        }
        for i in 0..n {
            if data[[i, i]] != 0.0 {
                return Err(Error::InvalidParameter {
                    name: "distances",
                    message: "diagonal must be zero",
                });
            }
            for j in (i + 1)..n {
                let d = data[[i, j]];
                if !d.is_finite() || d < 0.0 {
                    return Err(Error::InvalidParameter {
                        name: "distances",
                        message: "entries must be finite and non-negative",
                    });
                }
                if d != data[[j, i]] {
                    return Err(Error::InvalidParameter {
                        name: "distances",
                        message: "matrix must be symmetric",
                    });
                }
            }
        }
        Ok(Self { data })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Whether the matrix covers no observations.
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Distance between observations `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[[i, j]]
    }

    /// The full matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Upper triangle in row-major order, length `n(n-1)/2`.
    ///
    /// This is the layout SciPy and `kodama` call a condensed matrix.
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.len();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for row in 0..n.saturating_sub(1) {
            for col in (row + 1)..n {
                out.push(self.data[[row, col]]);
            }
        }
        out
    }
}

/// Euclidean distance between two observations.
#[inline]
pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    squared_euclidean(a, b).sqrt()
}

/// Squared Euclidean distance between two observations.
#[inline]
pub fn squared_euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Compute the Euclidean distance matrix over every selected column.
///
/// Only the upper triangle is computed; the lower triangle is mirrored from
/// it, so symmetry holds bit-for-bit.
pub fn compute_distances(table: &NumericTable) -> DistanceMatrix {
    let n = table.n_observations();
    let mut data = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = euclidean(table.row(i), table.row(j));
            data[[i, j]] = d;
            data[[j, i]] = d;
        }
    }
    DistanceMatrix { data }
}
