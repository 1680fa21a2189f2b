//! Per-cluster descriptive statistics.
//!
//! Once observations carry a cluster label, [`summarize`] reports for every
//! label how many observations it holds and, per numeric column, their mean
//! and sample standard deviation. [`ClusterSummarizer`] wraps the whole
//! select → cluster → summarize sequence behind one validated call.

mod pipeline;

pub use pipeline::{ClusterSummarizer, ClusteringRun, Method, RunDetail, SummarizerConfig};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cluster::ClusterAssignment;
use crate::error::{Error, Result};
use crate::table::{select_numeric, NumericTable, ObservationTable};

/// Mean and spread of one column within one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    /// Column name.
    pub column: String,
    /// Arithmetic mean over the cluster's members.
    pub mean: f64,
    /// Sample standard deviation (divides by n − 1); 0.0 for a
    /// single-member cluster.
    pub std_dev: f64,
}

/// Summary of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Cluster label.
    pub label: usize,
    /// Number of member observations.
    pub count: usize,
    /// Statistics per numeric column, in selection order.
    pub columns: Vec<ColumnStats>,
}

impl ClusterSummary {
    /// Statistics for one column, by name.
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.column == name)
    }

    /// Column means in selection order.
    pub fn means(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.mean).collect()
    }
}

/// Summarize `table` per cluster over the named numeric columns.
///
/// Returns one record per distinct label, ascending. Column checks are the
/// same as [`select_numeric`].
pub fn summarize<S: AsRef<str>>(
    table: &ObservationTable,
    assignment: &ClusterAssignment,
    numeric_columns: &[S],
) -> Result<Vec<ClusterSummary>> {
    let numeric = select_numeric(table, numeric_columns)?;
    summarize_numeric(&numeric, assignment)
}

/// Summarize an already projected table.
pub fn summarize_numeric(
    data: &NumericTable,
    assignment: &ClusterAssignment,
) -> Result<Vec<ClusterSummary>> {
    if assignment.len() != data.n_observations() {
        return Err(Error::DimensionMismatch {
            expected: data.n_observations(),
            found: assignment.len(),
        });
    }

    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in assignment.labels().iter().enumerate() {
        groups.entry(label).or_default().push(i);
    }

    let x = data.data();
    let summaries = groups
        .into_iter()
        .map(|(label, members)| {
            let count = members.len();
            let columns = data
                .columns()
                .iter()
                .enumerate()
                .map(|(j, name)| {
                    let values: Vec<f64> = members.iter().map(|&i| x[[i, j]]).collect();
                    let (mean, std_dev) = mean_and_sd(&values);
                    ColumnStats {
                        column: name.clone(),
                        mean,
                        std_dev,
                    }
                })
                .collect();
            ClusterSummary {
                label,
                count,
                columns,
            }
        })
        .collect();

    Ok(summaries)
}

fn mean_and_sd(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (mean, (ss / (n - 1) as f64).sqrt())
}
