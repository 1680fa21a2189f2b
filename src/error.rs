use thiserror::Error;

/// Result alias for `sift`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by table projection, clustering and summarization.
///
/// Every variant describes caller misuse. Nothing here is transient, so
/// nothing is retried: validation runs before any distance or clustering
/// work and the first failure is returned as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Input was empty.
    #[error("empty input provided")]
    EmptyInput,

    /// A requested column is absent or does not hold numbers.
    #[error("invalid column '{column}': {reason}")]
    InvalidColumn {
        /// Requested column name.
        column: String,
        /// Why the column cannot be used.
        reason: &'static str,
    },

    /// A selected numeric cell is undefined (missing, NaN or infinite).
    #[error("missing value in column '{column}' at observation {row}")]
    MissingValue {
        /// Column holding the undefined cell.
        column: String,
        /// Observation index.
        row: usize,
    },

    /// Invalid number of clusters requested.
    #[error("cannot create {requested} clusters from {n_items} observations")]
    InvalidK {
        /// Requested count.
        requested: usize,
        /// Number of observations.
        n_items: usize,
    },

    /// Iteration bound below one.
    #[error("max_iterations must be at least 1, got {0}")]
    InvalidIteration(usize),

    /// Length mismatch between two inputs that must agree.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Found length.
        found: usize,
    },

    /// An observation's columns differ from the table's columns.
    #[error("observation {row} does not have the table's column set")]
    ColumnSetMismatch {
        /// Offending observation index.
        row: usize,
    },

    /// Cluster labels do not form the range `0..k`.
    #[error("cluster labels are not contiguous: label {missing} is absent")]
    NonContiguousLabels {
        /// Smallest label in `0..=max` that no observation carries.
        missing: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },
}
