//! Observation tables and their numeric projections.
//!
//! An [`ObservationTable`] is what a caller hands in: rows of mixed numeric
//! and categorical cells under a fixed set of column names. Clustering only
//! ever sees a [`NumericTable`], the dense `n × d` matrix produced by
//! [`select_numeric`] once every selected cell has been checked.
//!
//! ```rust
//! use sift::table::{select_numeric, ObservationTable, Value};
//!
//! let mut table = ObservationTable::new(["cut", "carat", "price"]).unwrap();
//! table.push(vec!["Ideal".into(), 0.23.into(), 326.0.into()]).unwrap();
//! table.push(vec!["Good".into(), 0.31.into(), 335.0.into()]).unwrap();
//!
//! let numeric = select_numeric(&table, &["carat", "price"]).unwrap();
//! assert_eq!(numeric.n_observations(), 2);
//! assert!(select_numeric(&table, &["cut"]).is_err());
//! ```

use std::collections::{BTreeMap, HashSet};

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One cell of an observation.
///
/// Deserializes from a JSON number, string or `null` respectively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A measured quantity.
    Number(f64),
    /// A categorical label.
    Label(String),
    /// An undefined cell.
    Missing,
}

impl Value {
    /// The number held by this cell, if it is a finite number.
    pub fn as_finite(&self) -> Option<f64> {
        match self {
            Value::Number(x) if x.is_finite() => Some(*x),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(x)
    }
}

impl From<Option<f64>> for Value {
    fn from(x: Option<f64>) -> Self {
        x.map_or(Value::Missing, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Label(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Label(s)
    }
}

/// Ordered observations sharing one set of columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservationTable")]
pub struct ObservationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawObservationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawObservationTable> for ObservationTable {
    type Error = Error;

    fn try_from(raw: RawObservationTable) -> Result<Self> {
        let mut table = Self::new(raw.columns)?;
        for (row, values) in raw.rows.into_iter().enumerate() {
            if values.len() != table.columns.len() {
                return Err(Error::ColumnSetMismatch { row });
            }
            table.rows.push(values);
        }
        Ok(table)
    }
}

impl ObservationTable {
    /// Create an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidColumn {
                    column: name.clone(),
                    reason: "duplicate column name",
                });
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a table from name → value records.
    ///
    /// The first record fixes the column set; every later record must carry
    /// exactly the same names.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = BTreeMap<String, Value>>,
    {
        let mut records = records.into_iter();
        let Some(first) = records.next() else {
            return Self::new(Vec::<String>::new());
        };

        let columns: Vec<String> = first.keys().cloned().collect();
        let mut table = Self::new(columns)?;
        table.rows.push(first.into_values().collect());

        for (offset, mut record) in records.enumerate() {
            let row = offset + 1;
            if record.len() != table.columns.len() {
                return Err(Error::ColumnSetMismatch { row });
            }
            let mut values = Vec::with_capacity(table.columns.len());
            for name in &table.columns {
                match record.remove(name) {
                    Some(v) => values.push(v),
                    None => return Err(Error::ColumnSetMismatch { row }),
                }
            }
            table.rows.push(values);
        }

        Ok(table)
    }

    /// Append one observation, given in column order.
    pub fn push(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::DimensionMismatch {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in table order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no observations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One cell, by observation index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[col])
    }

    /// Iterate over observations in order.
    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

/// Dense numeric projection: one row per observation, one column per
/// selected variable. Every cell is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNumericTable")]
pub struct NumericTable {
    columns: Vec<String>,
    data: Array2<f64>,
}

#[derive(Deserialize)]
struct RawNumericTable {
    columns: Vec<String>,
    data: Array2<f64>,
}

impl TryFrom<RawNumericTable> for NumericTable {
    type Error = Error;

    fn try_from(raw: RawNumericTable) -> Result<Self> {
        Self::new(raw.columns, raw.data)
    }
}

impl NumericTable {
    /// Wrap an existing matrix.
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if columns.len() != data.ncols() {
            return Err(Error::DimensionMismatch {
                expected: data.ncols(),
                found: columns.len(),
            });
        }
        if let Some(((row, col), _)) = data.indexed_iter().find(|(_, x)| !x.is_finite()) {
            return Err(Error::MissingValue {
                column: columns[col].clone(),
                row,
            });
        }
        Ok(Self { columns, data })
    }

    /// Build from row vectors, naming columns `x0, x1, ...`.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let d = rows.first().map_or(0, Vec::len);
        if let Some(p) = rows.iter().find(|p| p.len() != d) {
            return Err(Error::DimensionMismatch {
                expected: d,
                found: p.len(),
            });
        }
        let data = Array2::from_shape_fn((rows.len(), d), |(i, j)| rows[i][j]);
        Self::new((0..d).map(|j| format!("x{j}")).collect(), data)
    }

    /// Selected column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The `n × d` matrix.
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Number of observations (`n`).
    pub fn n_observations(&self) -> usize {
        self.data.nrows()
    }

    /// Number of selected columns (`d`).
    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// One observation.
    pub fn row(&self, i: usize) -> ArrayView1<'_, f64> {
        self.data.row(i)
    }

    /// Z-score every column: subtract the mean, divide by the sample
    /// standard deviation.
    ///
    /// A column with zero spread (or a table with fewer than two rows) is
    /// only centred.
    pub fn standardized(&self) -> Self {
        let n = self.n_observations();
        let mut data = self.data.clone();
        if n == 0 {
            return self.clone();
        }
        for mut column in data.axis_iter_mut(Axis(1)) {
            let mean = column.sum() / n as f64;
            column.mapv_inplace(|x| x - mean);
            if n > 1 {
                let sd = (column.iter().map(|x| x * x).sum::<f64>() / (n - 1) as f64).sqrt();
                if sd > 0.0 {
                    column.mapv_inplace(|x| x / sd);
                }
            }
        }
        Self {
            columns: self.columns.clone(),
            data,
        }
    }
}

/// Project `table` onto the named numeric columns.
///
/// Type checks run over every selected column before any cell is checked
/// for missing values, so a categorical column is reported as
/// [`Error::InvalidColumn`] even when another column also has gaps.
pub fn select_numeric<S: AsRef<str>>(table: &ObservationTable, columns: &[S]) -> Result<NumericTable> {
    if columns.is_empty() {
        return Err(Error::InvalidParameter {
            name: "columns",
            message: "at least one column must be selected",
        });
    }

    let mut indices = Vec::with_capacity(columns.len());
    for name in columns {
        let name = name.as_ref();
        let Some(idx) = table.column_index(name) else {
            return Err(Error::InvalidColumn {
                column: name.to_string(),
                reason: "column not found",
            });
        };
        if indices.contains(&idx) {
            return Err(Error::InvalidColumn {
                column: name.to_string(),
                reason: "column selected more than once",
            });
        }
        if table.rows().any(|r| matches!(r[idx], Value::Label(_))) {
            return Err(Error::InvalidColumn {
                column: name.to_string(),
                reason: "column is not numeric",
            });
        }
        indices.push(idx);
    }

    for (row, values) in table.rows().enumerate() {
        for &idx in &indices {
            if values[idx].as_finite().is_none() {
                return Err(Error::MissingValue {
                    column: table.columns[idx].clone(),
                    row,
                });
            }
        }
    }

    let data = Array2::from_shape_fn((table.len(), indices.len()), |(i, j)| {
        table.rows[i][indices[j]].as_finite().unwrap_or(f64::NAN)
    });

    Ok(NumericTable {
        columns: indices.iter().map(|&i| table.columns[i].clone()).collect(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamonds() -> ObservationTable {
        let mut table = ObservationTable::new(["cut", "carat", "depth"]).unwrap();
        table
            .push(vec!["Ideal".into(), 0.23.into(), 61.5.into()])
            .unwrap();
        table
            .push(vec!["Premium".into(), 0.21.into(), 59.8.into()])
            .unwrap();
        table
            .push(vec!["Good".into(), 0.23.into(), Value::Missing])
            .unwrap();
        table
    }

    #[test]
    fn test_select_numeric_projects_in_request_order() {
        let mut table = diamonds();
        table.rows.pop();
        let numeric = select_numeric(&table, &["depth", "carat"]).unwrap();

        assert_eq!(numeric.columns(), ["depth", "carat"]);
        assert_eq!(numeric.data()[[0, 0]], 61.5);
        assert_eq!(numeric.data()[[1, 1]], 0.21);
    }

    #[test]
    fn test_select_numeric_rejects_absent_and_categorical_columns() {
        let table = diamonds();
        assert!(matches!(
            select_numeric(&table, &["color"]),
            Err(Error::InvalidColumn { reason: "column not found", .. })
        ));
        // `depth` has a gap but `cut` is checked for type first.
        assert!(matches!(
            select_numeric(&table, &["depth", "cut"]),
            Err(Error::InvalidColumn { reason: "column is not numeric", .. })
        ));
    }

    #[test]
    fn test_select_numeric_reports_first_missing_cell() {
        let err = select_numeric(&diamonds(), &["carat", "depth"]).unwrap_err();
        assert_eq!(
            err,
            Error::MissingValue {
                column: "depth".into(),
                row: 2
            }
        );
    }

    #[test]
    fn test_non_finite_numbers_count_as_missing() {
        let mut table = ObservationTable::new(["x"]).unwrap();
        table.push(vec![1.0.into()]).unwrap();
        table.push(vec![f64::NAN.into()]).unwrap();
        assert!(matches!(
            select_numeric(&table, &["x"]),
            Err(Error::MissingValue { row: 1, .. })
        ));
    }

    #[test]
    fn test_from_records_requires_identical_column_sets() {
        let a: BTreeMap<String, Value> =
            [("x".to_string(), 1.0.into()), ("y".to_string(), 2.0.into())].into();
        let b: BTreeMap<String, Value> =
            [("x".to_string(), 1.0.into()), ("z".to_string(), 2.0.into())].into();

        let table = ObservationTable::from_records([a.clone(), a.clone()]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "y"), Some(&Value::Number(2.0)));

        assert_eq!(
            ObservationTable::from_records([a, b]).unwrap_err(),
            Error::ColumnSetMismatch { row: 1 }
        );
    }

    #[test]
    fn test_push_and_new_validate_shape() {
        assert!(ObservationTable::new(["x", "x"]).is_err());
        let mut table = ObservationTable::new(["x", "y"]).unwrap();
        assert!(table.push(vec![1.0.into()]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_sd() {
        let numeric =
            NumericTable::from_rows(&[vec![1.0, 5.0], vec![2.0, 5.0], vec![6.0, 5.0]]).unwrap();
        let z = numeric.standardized();

        let first = z.data().column(0);
        let mean = first.sum() / 3.0;
        let var = first.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / 2.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);

        // Constant column is centred only.
        assert!(z.data().column(1).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_value_deserializes_from_plain_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[1.5, "Fair", null]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Number(1.5), Value::Label("Fair".into()), Value::Missing]
        );
    }

    #[test]
    fn test_deserialize_rejects_ragged_rows() {
        let t: ObservationTable =
            serde_json::from_str(r#"{"columns":["x","y"],"rows":[[1.0,2.0],[3.0,"a"]]}"#)
                .unwrap();
        assert_eq!(t.len(), 2);

        let ragged =
            serde_json::from_str::<ObservationTable>(r#"{"columns":["x","y"],"rows":[[1.0,2.0],[3.0]]}"#);
        assert!(ragged.is_err());

        let duplicate = serde_json::from_str::<ObservationTable>(r#"{"columns":["x","x"],"rows":[]}"#);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_numeric_table_deserialize_checks_columns() {
        let table = NumericTable::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let mut json = serde_json::to_value(&table).unwrap();
        let back: NumericTable = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back, table);

        json["columns"] = serde_json::json!(["x0"]);
        assert!(serde_json::from_value::<NumericTable>(json).is_err());
    }
}
