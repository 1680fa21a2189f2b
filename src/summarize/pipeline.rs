use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{summarize_numeric, ClusterSummary};
use crate::cluster::{
    build_dendrogram, check_k, ClusterAssignment, Dendrogram, Kmeans, KmeansFit, Linkage,
};
use crate::distance::compute_distances;
use crate::error::Result;
use crate::table::{select_numeric, ObservationTable};

fn default_k() -> usize {
    2
}

fn default_restarts() -> usize {
    10
}

fn default_max_iterations() -> usize {
    100
}

/// Grouping strategy and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Method {
    /// Agglomerative clustering, cut to `k` clusters.
    Hierarchical {
        /// Inter-cluster distance rule.
        #[serde(default)]
        linkage: Linkage,
    },
    /// Lloyd's k-means with restarts.
    Kmeans {
        /// Independent initializations.
        #[serde(default = "default_restarts")]
        restarts: usize,
        /// Assignment passes per restart.
        #[serde(default = "default_max_iterations")]
        max_iterations: usize,
        /// Base seed; restart `r` uses `seed + r`.
        #[serde(default)]
        seed: u64,
    },
}

impl Default for Method {
    fn default() -> Self {
        Method::Hierarchical {
            linkage: Linkage::default(),
        }
    }
}

impl Method {
    /// K-means with the default restart count and iteration bound.
    pub fn kmeans(seed: u64) -> Self {
        Method::Kmeans {
            restarts: default_restarts(),
            max_iterations: default_max_iterations(),
            seed,
        }
    }
}

/// Serializable description of a clustering run.
///
/// ```rust
/// use sift::summarize::{Method, SummarizerConfig};
///
/// let config: SummarizerConfig = serde_json::from_str(
///     r#"{ "columns": ["carat", "price"], "k": 3,
///          "method": { "kind": "kmeans", "seed": 42 } }"#,
/// ).unwrap();
/// assert!(matches!(config.method, Method::Kmeans { restarts: 10, seed: 42, .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Numeric columns to cluster on and summarize.
    pub columns: Vec<String>,
    /// Number of clusters.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Grouping strategy.
    #[serde(default)]
    pub method: Method,
    /// Z-score columns before clustering. Summaries stay in original units.
    #[serde(default)]
    pub standardize: bool,
}

/// The method-specific artefact of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunDetail {
    /// Full merge tree.
    Hierarchical(Dendrogram),
    /// Winning restart with its history.
    Kmeans(Box<KmeansFit>),
}

/// Output of [`ClusterSummarizer::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringRun {
    /// Cluster label per observation.
    pub assignment: ClusterAssignment,
    /// One summary per label, ascending.
    pub summaries: Vec<ClusterSummary>,
    /// Dendrogram or k-means fit.
    pub detail: RunDetail,
}

impl ClusteringRun {
    /// The dendrogram, for hierarchical runs.
    pub fn dendrogram(&self) -> Option<&Dendrogram> {
        match &self.detail {
            RunDetail::Hierarchical(d) => Some(d),
            RunDetail::Kmeans(_) => None,
        }
    }

    /// The k-means fit, for k-means runs.
    pub fn kmeans(&self) -> Option<&KmeansFit> {
        match &self.detail {
            RunDetail::Kmeans(fit) => Some(&**fit),
            RunDetail::Hierarchical(_) => None,
        }
    }
}

/// Select, cluster and summarize in one call.
///
/// Every parameter and every selected cell is validated before any distance
/// or clustering work starts; on error nothing partial is returned.
#[derive(Debug, Clone)]
pub struct ClusterSummarizer {
    config: SummarizerConfig,
}

impl ClusterSummarizer {
    /// Cluster on `columns` with the default method and `k = 2`.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config: SummarizerConfig {
                columns: columns.into_iter().map(Into::into).collect(),
                k: default_k(),
                method: Method::default(),
                standardize: false,
            },
        }
    }

    /// Build from a deserialized configuration.
    pub fn from_config(config: SummarizerConfig) -> Self {
        Self { config }
    }

    /// Set the number of clusters.
    pub fn with_k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    /// Set the grouping strategy.
    pub fn with_method(mut self, method: Method) -> Self {
        self.config.method = method;
        self
    }

    /// Use hierarchical clustering with `linkage`.
    pub fn with_linkage(self, linkage: Linkage) -> Self {
        self.with_method(Method::Hierarchical { linkage })
    }

    /// Z-score columns before clustering.
    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.config.standardize = standardize;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Run the pipeline on `table`.
    pub fn run(&self, table: &ObservationTable) -> Result<ClusteringRun> {
        let config = &self.config;
        let numeric = select_numeric(table, config.columns.as_slice())?;
        let n = numeric.n_observations();
        check_k(config.k, n)?;

        let plan = match &config.method {
            Method::Hierarchical { linkage } => Plan::Tree(*linkage),
            Method::Kmeans {
                restarts,
                max_iterations,
                seed,
            } => {
                let km = Kmeans::new(config.k)
                    .with_restarts(*restarts)
                    .with_max_iter(*max_iterations)
                    .with_seed(*seed);
                km.validate(n)?;
                Plan::Lloyd(km)
            }
        };

        let features = if config.standardize {
            numeric.standardized()
        } else {
            numeric.clone()
        };

        let (assignment, detail) = match plan {
            Plan::Tree(linkage) => {
                let dendro = build_dendrogram(&compute_distances(&features), linkage)?;
                (dendro.cut_to_k(config.k)?, RunDetail::Hierarchical(dendro))
            }
            Plan::Lloyd(km) => {
                let fit = km.fit(&features)?;
                (fit.assignment.clone(), RunDetail::Kmeans(Box::new(fit)))
            }
        };

        let summaries = summarize_numeric(&numeric, &assignment)?;
        debug!(
            columns = ?config.columns,
            standardize = config.standardize,
            "summarized clusters"
        );
        debug!(
            n,
            k = assignment.n_clusters(),
            method = ?config.method,
            "clustering run complete"
        );

        Ok(ClusteringRun {
            assignment,
            summaries,
            detail,
        })
    }
}

enum Plan {
    Tree(Linkage),
    Lloyd(Kmeans),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::table::Value;

    fn six_points() -> ObservationTable {
        let mut t = ObservationTable::new(["id", "x", "y"]).unwrap();
        for (i, (x, y)) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (10.0, 10.0), (10.0, 11.0), (11.0, 10.0)]
            .into_iter()
            .enumerate()
        {
            t.push(vec![format!("p{i}").into(), x.into(), y.into()]).unwrap();
        }
        t
    }

    #[test]
    fn test_hierarchical_run_reports_low_and_high_groups() {
        let run = ClusterSummarizer::new(["x", "y"])
            .with_linkage(Linkage::Average)
            .run(&six_points())
            .unwrap();

        assert_eq!(run.assignment.labels(), [0, 0, 0, 1, 1, 1]);
        assert_eq!(run.dendrogram().map(Dendrogram::n_merges), Some(5));
        assert!(run.kmeans().is_none());

        let low = run.summaries[0].means();
        let high = run.summaries[1].means();
        assert!((low[0] - 1.0 / 3.0).abs() < 1e-12 && (low[1] - 1.0 / 3.0).abs() < 1e-12);
        assert!((high[0] - 31.0 / 3.0).abs() < 1e-12 && (high[1] - 31.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_kmeans_run_keeps_original_units_when_standardized() {
        let run = ClusterSummarizer::new(["x", "y"])
            .with_method(Method::kmeans(11))
            .with_standardize(true)
            .run(&six_points())
            .unwrap();

        let fit = run.kmeans().unwrap();
        assert_eq!(fit.restart_objectives.len(), 10);
        let mut means: Vec<f64> = run.summaries.iter().map(|s| s.means()[0]).collect();
        means.sort_by(f64::total_cmp);
        assert!((means[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((means[1] - 31.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_validation_precedes_work() {
        let table = six_points();
        assert!(matches!(
            ClusterSummarizer::new(["x", "id"]).run(&table),
            Err(Error::InvalidColumn { .. })
        ));
        assert!(matches!(
            ClusterSummarizer::new(["x"]).with_k(7).run(&table),
            Err(Error::InvalidK { requested: 7, n_items: 6 })
        ));
        let bad_iter = Method::Kmeans {
            restarts: 1,
            max_iterations: 0,
            seed: 0,
        };
        assert_eq!(
            ClusterSummarizer::new(["x"]).with_method(bad_iter).run(&table).unwrap_err(),
            Error::InvalidIteration(0)
        );

        let mut gappy = six_points();
        gappy.push(vec!["p6".into(), Value::Missing, 2.0.into()]).unwrap();
        assert!(matches!(
            ClusterSummarizer::new(["x", "y"]).run(&gappy),
            Err(Error::MissingValue { row: 6, .. })
        ));
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: SummarizerConfig = serde_json::from_str(r#"{ "columns": ["x"] }"#).unwrap();
        assert_eq!(config.k, 2);
        assert_eq!(
            config.method,
            Method::Hierarchical {
                linkage: Linkage::Complete
            }
        );
        assert!(!config.standardize);

        let config: SummarizerConfig = serde_json::from_str(
            r#"{ "columns": ["x", "y"], "k": 3, "standardize": true,
                 "method": { "kind": "hierarchical", "linkage": "single" } }"#,
        )
        .unwrap();
        let summarizer = ClusterSummarizer::from_config(config);
        assert_eq!(summarizer.config().k, 3);

        let run = summarizer.run(&six_points()).unwrap();
        assert_eq!(run.summaries.len(), 3);
    }
}
