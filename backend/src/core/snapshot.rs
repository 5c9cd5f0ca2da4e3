//! Matrix Snapshot - Save/Load Sector Matrices
//!
//! Serializable form of a [`SectorMatrix`] so that intermediate pipeline
//! products (balanced flows, forecast IOMs) can be handed to downstream
//! collaborators as JSON.
//!
//! # Critical Invariants
//!
//! - **Undefined cells**: encoded as `null`, decoded back to undefined
//! - **Integrity**: every snapshot carries the SHA-256 fingerprint of the
//!   matrix it was taken from; loading rejects a snapshot whose contents
//!   no longer match it

use crate::core::matrix::{MatrixError, SectorMatrix, TagColumn};
use serde::{Deserialize, Serialize};

/// Serializable matrix state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSnapshot {
    pub rows: Vec<String>,
    pub cols: Vec<String>,

    /// Row-major cells, `None` for undefined
    pub cells: Vec<Vec<Option<f64>>>,

    pub tags: Vec<TagColumn>,
    pub total_row: Option<String>,
    pub total_col: Option<String>,

    /// SHA-256 of the source matrix (see [`SectorMatrix::fingerprint`])
    pub fingerprint: String,
}

impl From<&SectorMatrix> for MatrixSnapshot {
    fn from(matrix: &SectorMatrix) -> Self {
        let (n_rows, n_cols) = matrix.shape();
        let cells = (0..n_rows)
            .map(|i| {
                (0..n_cols)
                    .map(|j| {
                        let v = matrix.at(i, j);
                        (!v.is_nan()).then_some(v)
                    })
                    .collect()
            })
            .collect();

        MatrixSnapshot {
            rows: matrix.rows().to_vec(),
            cols: matrix.cols().to_vec(),
            cells,
            tags: matrix.tags().to_vec(),
            total_row: matrix.total_row().map(str::to_string),
            total_col: matrix.total_col().map(str::to_string),
            fingerprint: matrix.fingerprint(),
        }
    }
}

impl MatrixSnapshot {
    /// Rebuild the matrix and verify its fingerprint
    pub fn restore(&self) -> Result<SectorMatrix, MatrixError> {
        let values = self
            .cells
            .iter()
            .map(|row| row.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
            .collect();

        let mut matrix = SectorMatrix::from_rows(self.rows.clone(), self.cols.clone(), values)?;
        for tag in &self.tags {
            matrix = matrix.with_tag(&tag.name, tag.values.clone())?;
        }
        if let Some(label) = &self.total_row {
            matrix = matrix.with_total_row(label)?;
        }
        if let Some(label) = &self.total_col {
            matrix = matrix.with_total_col(label)?;
        }

        let computed = matrix.fingerprint();
        if computed != self.fingerprint {
            return Err(MatrixError::FingerprintMismatch {
                stored: self.fingerprint.clone(),
                computed,
            });
        }
        Ok(matrix)
    }

    pub fn to_json(&self) -> Result<String, MatrixError> {
        serde_json::to_string(self).map_err(|e| MatrixError::Decode(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, MatrixError> {
        serde_json::from_str(json).map_err(|e| MatrixError::Decode(e.to_string()))
    }
}

impl SectorMatrix {
    /// Serialize to JSON through a [`MatrixSnapshot`]
    pub fn to_json(&self) -> Result<String, MatrixError> {
        MatrixSnapshot::from(self).to_json()
    }

    /// Load from JSON produced by [`SectorMatrix::to_json`]
    pub fn from_json(json: &str) -> Result<SectorMatrix, MatrixError> {
        MatrixSnapshot::from_json(json)?.restore()
    }
}
