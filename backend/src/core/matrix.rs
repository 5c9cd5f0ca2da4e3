//! Sector matrix
//!
//! Labeled dense table shared by every stage of the pipeline. Rows and
//! columns are addressed by sector label; cells are `f64` stored row-major.
//!
//! A matrix may carry:
//! - **Tag columns**: non-numeric per-row text (e.g. a "Category" column)
//!   that rides along with the numeric cells but never takes part in
//!   arithmetic
//! - **Total markers**: the labels of a synthetic total row and/or total
//!   column, so that "body" operations can skip them
//!
//! # Critical Invariants
//!
//! 1. **Unique labels**: no two rows (or two columns) share a label
//! 2. **Dense shape**: `cells.len() == rows.len() * cols.len()`
//! 3. **Undefined cells**: a cell with no meaningful value (e.g. the corner
//!    of a builder total row/column) is NaN internally and `None` through
//!    [`SectorMatrix::value`]
//! 4. **Zero-fill division**: element-wise division never produces
//!    infinities; a zero divisor yields zero

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors raised by structural matrix operations
#[derive(Debug, Error, PartialEq)]
pub enum MatrixError {
    #[error("Row '{0}' not found in matrix")]
    UnknownRow(String),

    #[error("Column '{0}' not found in matrix")]
    UnknownColumn(String),

    #[error("Duplicate label '{0}'")]
    DuplicateLabel(String),

    #[error("Shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Tag column '{name}' has {len} values for {rows} rows")]
    TagLength {
        name: String,
        len: usize,
        rows: usize,
    },

    #[error("Snapshot fingerprint mismatch: stored {stored}, computed {computed}")]
    FingerprintMismatch { stored: String, computed: String },

    #[error("Snapshot could not be decoded: {0}")]
    Decode(String),
}

/// Non-numeric per-row column
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagColumn {
    pub name: String,
    pub values: Vec<String>,
}

/// Labeled dense numeric table indexed by sector
///
/// # Example
///
/// ```rust
/// use regional_io_core_rs::SectorMatrix;
///
/// let mut m = SectorMatrix::square(vec!["A".to_string(), "B".to_string()]).unwrap();
/// m.set("A", "B", 4.0).unwrap();
/// m.append_total_row("TotalBought").unwrap();
/// m.append_total_col("TotalSold").unwrap();
///
/// assert_eq!(m.value("TotalBought", "B"), Some(4.0));
/// assert_eq!(m.value("A", "TotalSold"), Some(4.0));
/// assert_eq!(m.value("TotalBought", "TotalSold"), None); // corner undefined
/// assert!(m.is_square());
/// ```
#[derive(Debug, Clone)]
pub struct SectorMatrix {
    rows: Vec<String>,
    cols: Vec<String>,
    cells: Vec<f64>,
    tags: Vec<TagColumn>,
    total_row: Option<String>,
    total_col: Option<String>,
}

fn check_unique(labels: &[String]) -> Result<(), MatrixError> {
    let mut seen = HashSet::with_capacity(labels.len());
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(MatrixError::DuplicateLabel(label.clone()));
        }
    }
    Ok(())
}

/// Round `x` to `decimal_places` digits
pub fn round_dp(x: f64, decimal_places: u32) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    (x * factor).round() / factor
}

impl SectorMatrix {
    /// Create a zero-filled matrix with the given labels
    pub fn zeros(rows: Vec<String>, cols: Vec<String>) -> Result<Self, MatrixError> {
        check_unique(&rows)?;
        check_unique(&cols)?;
        let cells = vec![0.0; rows.len() * cols.len()];
        Ok(Self {
            rows,
            cols,
            cells,
            tags: Vec::new(),
            total_row: None,
            total_col: None,
        })
    }

    /// Create a zero-filled square matrix over `labels`
    pub fn square(labels: Vec<String>) -> Result<Self, MatrixError> {
        Self::zeros(labels.clone(), labels)
    }

    /// Create a matrix from row-major values
    ///
    /// Fails with [`MatrixError::ShapeMismatch`] if `values` does not have
    /// exactly `rows.len()` rows of `cols.len()` cells.
    pub fn from_rows(
        rows: Vec<String>,
        cols: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, MatrixError> {
        let mut matrix = Self::zeros(rows, cols)?;
        let width = matrix.cols.len();
        if values.len() != matrix.rows.len() || values.iter().any(|row| row.len() != width) {
            return Err(MatrixError::ShapeMismatch {
                expected_rows: matrix.rows.len(),
                expected_cols: width,
                rows: values.len(),
                cols: values.first().map(Vec::len).unwrap_or(0),
            });
        }

        matrix.cells = values.into_iter().flatten().collect();
        Ok(matrix)
    }

    /// Attach a non-numeric tag column
    pub fn with_tag(mut self, name: &str, values: Vec<String>) -> Result<Self, MatrixError> {
        if values.len() != self.rows.len() {
            return Err(MatrixError::TagLength {
                name: name.to_string(),
                len: values.len(),
                rows: self.rows.len(),
            });
        }
        if self.tags.iter().any(|t| t.name == name) {
            return Err(MatrixError::DuplicateLabel(name.to_string()));
        }
        self.tags.push(TagColumn {
            name: name.to_string(),
            values,
        });
        Ok(self)
    }

    /// Mark an existing row as the synthetic total row
    pub fn with_total_row(mut self, label: &str) -> Result<Self, MatrixError> {
        self.row_index(label)
            .ok_or_else(|| MatrixError::UnknownRow(label.to_string()))?;
        self.total_row = Some(label.to_string());
        Ok(self)
    }

    /// Mark an existing column as the synthetic total column
    pub fn with_total_col(mut self, label: &str) -> Result<Self, MatrixError> {
        self.col_index(label)
            .ok_or_else(|| MatrixError::UnknownColumn(label.to_string()))?;
        self.total_col = Some(label.to_string());
        Ok(self)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn cols(&self) -> &[String] {
        &self.cols
    }

    pub fn tags(&self) -> &[TagColumn] {
        &self.tags
    }

    pub fn tag(&self, name: &str) -> Option<&TagColumn> {
        self.tags.iter().find(|t| t.name == name)
    }

    pub fn total_row(&self) -> Option<&str> {
        self.total_row.as_deref()
    }

    pub fn total_col(&self) -> Option<&str> {
        self.total_col.as_deref()
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == label)
    }

    pub fn col_index(&self, label: &str) -> Option<usize> {
        self.cols.iter().position(|c| c == label)
    }

    fn require_row(&self, label: &str) -> Result<usize, MatrixError> {
        self.row_index(label)
            .ok_or_else(|| MatrixError::UnknownRow(label.to_string()))
    }

    fn require_col(&self, label: &str) -> Result<usize, MatrixError> {
        self.col_index(label)
            .ok_or_else(|| MatrixError::UnknownColumn(label.to_string()))
    }

    /// Raw cell by position (may be NaN); callers hold in-range indices
    pub(crate) fn at(&self, row: usize, col: usize) -> f64 {
        self.cells[row * self.cols.len() + col]
    }

    pub(crate) fn set_at(&mut self, row: usize, col: usize, value: f64) {
        let width = self.cols.len();
        self.cells[row * width + col] = value;
    }

    /// Raw cell by label (may be NaN)
    pub fn get(&self, row: &str, col: &str) -> Result<f64, MatrixError> {
        let i = self.require_row(row)?;
        let j = self.require_col(col)?;
        Ok(self.at(i, j))
    }

    /// Defined cell by label; `None` when the label is missing or the cell is undefined
    pub fn value(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.row_index(row)?;
        let j = self.col_index(col)?;
        let v = self.at(i, j);
        (!v.is_nan()).then_some(v)
    }

    pub fn set(&mut self, row: &str, col: &str, value: f64) -> Result<(), MatrixError> {
        let i = self.require_row(row)?;
        let j = self.require_col(col)?;
        self.set_at(i, j, value);
        Ok(())
    }

    pub fn row_values(&self, label: &str) -> Result<Vec<f64>, MatrixError> {
        let i = self.require_row(label)?;
        Ok((0..self.cols.len()).map(|j| self.at(i, j)).collect())
    }

    pub fn column_values(&self, label: &str) -> Result<Vec<f64>, MatrixError> {
        let j = self.require_col(label)?;
        Ok((0..self.rows.len()).map(|i| self.at(i, j)).collect())
    }

    // ========================================================================
    // Body / totals
    // ========================================================================

    fn is_total_row(&self, i: usize) -> bool {
        self.total_row.as_deref() == Some(self.rows[i].as_str())
    }

    fn is_total_col(&self, j: usize) -> bool {
        self.total_col.as_deref() == Some(self.cols[j].as_str())
    }

    /// Row labels excluding the total row
    pub fn body_rows(&self) -> Vec<&str> {
        (0..self.rows.len())
            .filter(|&i| !self.is_total_row(i))
            .map(|i| self.rows[i].as_str())
            .collect()
    }

    /// Column labels excluding the total column
    pub fn body_cols(&self) -> Vec<&str> {
        (0..self.cols.len())
            .filter(|&j| !self.is_total_col(j))
            .map(|j| self.cols[j].as_str())
            .collect()
    }

    /// True when the body row label set equals the body column label set
    pub fn is_square(&self) -> bool {
        let rows: HashSet<&str> = self.body_rows().into_iter().collect();
        let cols: HashSet<&str> = self.body_cols().into_iter().collect();
        rows == cols
    }

    /// Sum of row `i` across body columns, skipping undefined cells
    pub fn body_row_sum(&self, i: usize) -> f64 {
        (0..self.cols.len())
            .filter(|&j| !self.is_total_col(j))
            .map(|j| self.at(i, j))
            .filter(|v| !v.is_nan())
            .sum()
    }

    /// Sum of column `j` across body rows, skipping undefined cells
    pub fn body_col_sum(&self, j: usize) -> f64 {
        (0..self.rows.len())
            .filter(|&i| !self.is_total_row(i))
            .map(|i| self.at(i, j))
            .filter(|v| !v.is_nan())
            .sum()
    }

    /// Append a total row holding column sums; the total-column cell stays undefined
    pub fn append_total_row(&mut self, label: &str) -> Result<(), MatrixError> {
        if self.row_index(label).is_some() {
            return Err(MatrixError::DuplicateLabel(label.to_string()));
        }
        let sums: Vec<f64> = (0..self.cols.len())
            .map(|j| {
                if self.is_total_col(j) {
                    f64::NAN
                } else {
                    self.body_col_sum(j)
                }
            })
            .collect();

        self.rows.push(label.to_string());
        self.cells.extend(sums);
        for tag in &mut self.tags {
            tag.values.push(String::new());
        }
        self.total_row = Some(label.to_string());
        Ok(())
    }

    /// Append a total column holding row sums; the total-row cell stays undefined
    pub fn append_total_col(&mut self, label: &str) -> Result<(), MatrixError> {
        if self.col_index(label).is_some() {
            return Err(MatrixError::DuplicateLabel(label.to_string()));
        }
        let sums: Vec<f64> = (0..self.rows.len())
            .map(|i| {
                if self.is_total_row(i) {
                    f64::NAN
                } else {
                    self.body_row_sum(i)
                }
            })
            .collect();

        let at = self.cols.len();
        self.insert_column(at, label, 0.0)?;
        for (i, sum) in sums.into_iter().enumerate() {
            self.set_at(i, at, sum);
        }
        self.total_col = Some(label.to_string());
        Ok(())
    }

    /// Recompute both total markers in place
    ///
    /// The total row receives body column sums; the total column receives
    /// body row sums for every row, so its total-row cell is the grand total.
    pub fn recompute_totals(&mut self) {
        if let Some(ti) = self.total_row.as_deref().and_then(|l| self.row_index(l)) {
            for j in 0..self.cols.len() {
                if !self.is_total_col(j) {
                    let sum = self.body_col_sum(j);
                    self.set_at(ti, j, sum);
                }
            }
        }
        if let Some(tj) = self.total_col.as_deref().and_then(|l| self.col_index(l)) {
            for i in 0..self.rows.len() {
                let sum = self.body_row_sum(i);
                self.set_at(i, tj, sum);
            }
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Conform the matrix to new labels, filling cells that did not exist
    ///
    /// Tag values for new rows are empty strings. Total markers survive only
    /// if their label is still present.
    pub fn reindex(
        &self,
        rows: &[String],
        cols: &[String],
        fill: f64,
    ) -> Result<SectorMatrix, MatrixError> {
        let mut out = SectorMatrix::zeros(rows.to_vec(), cols.to_vec())?;
        let row_map: Vec<Option<usize>> = rows.iter().map(|r| self.row_index(r)).collect();
        let col_map: Vec<Option<usize>> = cols.iter().map(|c| self.col_index(c)).collect();

        for (i, src_i) in row_map.iter().enumerate() {
            for (j, src_j) in col_map.iter().enumerate() {
                let v = match (src_i, src_j) {
                    (Some(si), Some(sj)) => self.at(*si, *sj),
                    _ => fill,
                };
                out.set_at(i, j, v);
            }
        }

        out.tags = self
            .tags
            .iter()
            .map(|tag| TagColumn {
                name: tag.name.clone(),
                values: row_map
                    .iter()
                    .map(|src| src.map(|si| tag.values[si].clone()).unwrap_or_default())
                    .collect(),
            })
            .collect();
        out.total_row = self.total_row.clone().filter(|l| rows.contains(l));
        out.total_col = self.total_col.clone().filter(|l| cols.contains(l));
        Ok(out)
    }

    /// Like [`reindex`](Self::reindex), but every label must already exist
    pub fn select(&self, rows: &[String], cols: &[String]) -> Result<SectorMatrix, MatrixError> {
        for r in rows {
            self.require_row(r)?;
        }
        for c in cols {
            self.require_col(c)?;
        }
        self.reindex(rows, cols, 0.0)
    }

    /// Keep rows and columns up to and including the given labels
    pub fn slice_through(&self, last_row: &str, last_col: &str) -> Result<SectorMatrix, MatrixError> {
        let ri = self.require_row(last_row)?;
        let cj = self.require_col(last_col)?;
        self.reindex(&self.rows[..=ri], &self.cols[..=cj], 0.0)
    }

    /// Insert a column at position `at`, every cell set to `fill`
    pub fn insert_column(&mut self, at: usize, label: &str, fill: f64) -> Result<(), MatrixError> {
        if self.col_index(label).is_some() {
            return Err(MatrixError::DuplicateLabel(label.to_string()));
        }
        let at = at.min(self.cols.len());
        let old_width = self.cols.len();
        let mut cells = Vec::with_capacity(self.rows.len() * (old_width + 1));
        for i in 0..self.rows.len() {
            let row = &self.cells[i * old_width..(i + 1) * old_width];
            cells.extend_from_slice(&row[..at]);
            cells.push(fill);
            cells.extend_from_slice(&row[at..]);
        }
        self.cells = cells;
        self.cols.insert(at, label.to_string());
        Ok(())
    }

    /// Remove a row, returning its values
    pub fn remove_row(&mut self, label: &str) -> Result<Vec<f64>, MatrixError> {
        let i = self.require_row(label)?;
        let width = self.cols.len();
        let removed: Vec<f64> = self.cells.drain(i * width..(i + 1) * width).collect();
        self.rows.remove(i);
        for tag in &mut self.tags {
            tag.values.remove(i);
        }
        if self.total_row.as_deref() == Some(label) {
            self.total_row = None;
        }
        Ok(removed)
    }

    /// Remove a column, returning its values
    pub fn remove_col(&mut self, label: &str) -> Result<Vec<f64>, MatrixError> {
        let j = self.require_col(label)?;
        let width = self.cols.len();
        let mut removed = Vec::with_capacity(self.rows.len());
        let mut cells = Vec::with_capacity(self.rows.len() * (width - 1));
        for i in 0..self.rows.len() {
            for k in 0..width {
                let v = self.cells[i * width + k];
                if k == j {
                    removed.push(v);
                } else {
                    cells.push(v);
                }
            }
        }
        self.cells = cells;
        self.cols.remove(j);
        if self.total_col.as_deref() == Some(label) {
            self.total_col = None;
        }
        Ok(removed)
    }

    /// Append `label` as a new row, or overwrite it if it already exists
    ///
    /// Columns absent from `values` are left undefined.
    pub fn upsert_row(
        &mut self,
        label: &str,
        values: &BTreeMap<String, f64>,
    ) -> Result<(), MatrixError> {
        let mut row = vec![f64::NAN; self.cols.len()];
        for (col, v) in values {
            let j = self.require_col(col)?;
            row[j] = *v;
        }

        match self.row_index(label) {
            Some(i) => {
                for (j, v) in row.into_iter().enumerate() {
                    self.set_at(i, j, v);
                }
            }
            None => {
                self.rows.push(label.to_string());
                self.cells.extend(row);
                for tag in &mut self.tags {
                    tag.values.push(String::new());
                }
            }
        }
        Ok(())
    }

    pub fn rename_row(&mut self, from: &str, to: &str) -> Result<(), MatrixError> {
        let i = self.require_row(from)?;
        if from != to && self.row_index(to).is_some() {
            return Err(MatrixError::DuplicateLabel(to.to_string()));
        }
        if self.total_row.as_deref() == Some(from) {
            self.total_row = Some(to.to_string());
        }
        self.rows[i] = to.to_string();
        Ok(())
    }

    pub fn rename_col(&mut self, from: &str, to: &str) -> Result<(), MatrixError> {
        let j = self.require_col(from)?;
        if from != to && self.col_index(to).is_some() {
            return Err(MatrixError::DuplicateLabel(to.to_string()));
        }
        if self.total_col.as_deref() == Some(from) {
            self.total_col = Some(to.to_string());
        }
        self.cols[j] = to.to_string();
        Ok(())
    }

    // ========================================================================
    // Arithmetic
    // ========================================================================

    /// Multiply every numeric cell by `factor`; tag columns are untouched
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.cells {
            *v *= factor;
        }
    }

    /// Multiply the body cells of one row by `factor`
    pub fn scale_row(&mut self, label: &str, factor: f64) -> Result<(), MatrixError> {
        let i = self.require_row(label)?;
        for j in 0..self.cols.len() {
            if !self.is_total_col(j) {
                let v = self.at(i, j);
                self.set_at(i, j, v * factor);
            }
        }
        Ok(())
    }

    /// Multiply the body cells of one column by `factor`
    pub fn scale_col(&mut self, label: &str, factor: f64) -> Result<(), MatrixError> {
        let j = self.require_col(label)?;
        for i in 0..self.rows.len() {
            if !self.is_total_row(i) {
                let v = self.at(i, j);
                self.set_at(i, j, v * factor);
            }
        }
        Ok(())
    }

    pub fn map_cells<F: Fn(f64) -> f64>(&mut self, f: F) {
        for v in &mut self.cells {
            *v = f(*v);
        }
    }

    pub fn round_to(&mut self, decimal_places: u32) {
        self.map_cells(|v| round_dp(v, decimal_places));
    }

    /// Element-wise `self / divisor`, zero where the divisor is zero
    ///
    /// Both matrices must share identical row and column labels.
    /// Undefined cells stay undefined.
    pub fn div_zero_fill(&self, divisor: &SectorMatrix) -> Result<SectorMatrix, MatrixError> {
        if self.rows != divisor.rows || self.cols != divisor.cols {
            return Err(MatrixError::ShapeMismatch {
                expected_rows: self.rows.len(),
                expected_cols: self.cols.len(),
                rows: divisor.rows.len(),
                cols: divisor.cols.len(),
            });
        }
        let mut out = self.clone();
        for (v, d) in out.cells.iter_mut().zip(&divisor.cells) {
            if v.is_nan() || d.is_nan() {
                *v = f64::NAN;
            } else if *d == 0.0 {
                *v = 0.0;
            } else {
                *v /= d;
            }
        }
        Ok(out)
    }

    /// Element-wise product over the labels both matrices share
    ///
    /// Row and column order follow `self`; tag columns and total markers are
    /// taken from `self`.
    pub fn mul_aligned(&self, other: &SectorMatrix) -> Result<SectorMatrix, MatrixError> {
        let rows: Vec<String> = self
            .rows
            .iter()
            .filter(|r| other.row_index(r).is_some())
            .cloned()
            .collect();
        let cols: Vec<String> = self
            .cols
            .iter()
            .filter(|c| other.col_index(c).is_some())
            .cloned()
            .collect();

        let mut out = self.reindex(&rows, &cols, 0.0)?;
        for (i, r) in rows.iter().enumerate() {
            let oi = other.require_row(r)?;
            for (j, c) in cols.iter().enumerate() {
                let oj = other.require_col(c)?;
                let v = out.at(i, j) * other.at(oi, oj);
                out.set_at(i, j, v);
            }
        }
        Ok(out)
    }

    /// Deterministic SHA-256 digest of labels, tags and cell bits
    ///
    /// Two matrices have the same fingerprint exactly when they are
    /// bitwise identical.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for label in &self.rows {
            hasher.update(b"r");
            hasher.update(label.as_bytes());
            hasher.update([0u8]);
        }
        for label in &self.cols {
            hasher.update(b"c");
            hasher.update(label.as_bytes());
            hasher.update([0u8]);
        }
        for tag in &self.tags {
            hasher.update(b"t");
            hasher.update(tag.name.as_bytes());
            for v in &tag.values {
                hasher.update([0u8]);
                hasher.update(v.as_bytes());
            }
        }
        hasher.update(self.total_row.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]);
        hasher.update(self.total_col.as_deref().unwrap_or("").as_bytes());
        for v in &self.cells {
            // all undefined cells hash alike, whatever their NaN payload
            let bits = if v.is_nan() { f64::NAN.to_bits() } else { v.to_bits() };
            hasher.update(bits.to_le_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
