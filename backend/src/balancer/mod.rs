//! Flow Balancer
//!
//! Iteratively rescales the rows and columns of a sector-flow matrix until,
//! for every monitored sector, total purchases match total sales.
//!
//! # Overview
//!
//! 1. **Init** ([`FlowBalancer::fixed_matrix`]): drop stale totals, apply
//!    the year's correction factors to sector columns, recompute totals
//! 2. **Iterate** ([`FlowBalancer::relax_pass`]): one Gauss-Seidel pass over
//!    the monitored sectors in declaration order
//!    - imbalance > 0 → scale the sector's column by `row_total / col_total`
//!    - imbalance < 0 → scale the sector's row by `col_total / row_total`
//!    - totals are recomputed after every sector, so each correction is
//!      visible to the next sector in the same pass
//! 3. **Terminal**: divide every cell by the first row's total purchase
//!
//! # Critical Invariants
//!
//! 1. **Sequential relaxation**: sector order matters and is preserved
//! 2. **Bounded**: at most `max_iterations` passes
//! 3. **No panics on degeneracy**: a zero total leaves the sector unscaled
//! 4. **Reported convergence**: [`BalanceOutcome::converged`] is true exactly
//!    when the final residual is below `target_threshold`

pub mod equilibrium;

pub use equilibrium::EquilibriumVector;

use crate::core::matrix::{MatrixError, SectorMatrix};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Year → (sector → multiplicative correction factor)
pub type CorrectionTable = BTreeMap<String, BTreeMap<String, f64>>;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum BalanceError {
    #[error("Sector '{0}' is not both a row and a column of the flow matrix")]
    UnknownSector(String),

    #[error("No correction factors defined for year {0}")]
    MissingCorrectionYear(String),

    #[error("Flow matrix has no total row '{0}'")]
    MissingTotalRow(String),

    #[error("Flow matrix has no total column '{0}'")]
    MissingTotalCol(String),

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the balancing loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Rounding precision for imbalance comparisons
    pub decimal_places: u32,

    /// Convergence tolerance on Σ|imbalance|
    pub target_threshold: f64,

    /// Safety cap on relaxation passes
    pub max_iterations: usize,

    /// Label of the total-purchase column
    pub total_col: String,

    /// Label of the total-sale row
    pub total_row: String,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            decimal_places: 3,
            target_threshold: 1e-6,
            max_iterations: 100,
            total_col: "Totali".to_string(),
            total_row: "Totalj".to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result of a complete balancing run
#[derive(Debug, Clone)]
pub struct BalanceOutcome {
    /// Balanced (or best-effort) matrix, normalized by the first row's total
    pub matrix: SectorMatrix,

    /// Relaxation passes performed
    pub iterations: usize,

    /// Whether the residual fell below the threshold
    pub converged: bool,

    /// Σ|imbalance| before normalization
    pub residual: f64,

    /// Imbalance before normalization
    pub equilibrium: EquilibriumVector,
}

// ============================================================================
// Balancer
// ============================================================================

/// Balances a sector-flow matrix
///
/// The matrix must carry a total row and a total column named as in the
/// [`BalancerConfig`]; every monitored sector must be both a row and a
/// column.
#[derive(Debug, Clone)]
pub struct FlowBalancer {
    matrix: SectorMatrix,
    monitored: Vec<String>,
    corrections: CorrectionTable,
    config: BalancerConfig,
}

impl FlowBalancer {
    pub fn new(
        matrix: SectorMatrix,
        monitored: Vec<String>,
        corrections: CorrectionTable,
        config: BalancerConfig,
    ) -> Result<Self, BalanceError> {
        if matrix.row_index(&config.total_row).is_none() {
            return Err(BalanceError::MissingTotalRow(config.total_row.clone()));
        }
        if matrix.col_index(&config.total_col).is_none() {
            return Err(BalanceError::MissingTotalCol(config.total_col.clone()));
        }
        if let Some(sector) = monitored
            .iter()
            .find(|s| matrix.row_index(s).is_none() || matrix.col_index(s).is_none())
        {
            return Err(BalanceError::UnknownSector(sector.clone()));
        }

        let matrix = matrix
            .with_total_row(&config.total_row)?
            .with_total_col(&config.total_col)?;

        Ok(Self {
            matrix,
            monitored,
            corrections,
            config,
        })
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn matrix(&self) -> &SectorMatrix {
        &self.matrix
    }

    pub fn monitored(&self) -> &[String] {
        &self.monitored
    }

    /// Starting matrix for `year`: corrections applied, totals recomputed
    ///
    /// The corner of the result holds the grand total.
    pub fn fixed_matrix(&self, year: &str) -> Result<SectorMatrix, BalanceError> {
        let factors = self
            .corrections
            .get(year)
            .ok_or_else(|| BalanceError::MissingCorrectionYear(year.to_string()))?;

        let mut fixed = self.matrix.clone();
        fixed.remove_row(&self.config.total_row)?;
        fixed.remove_col(&self.config.total_col)?;

        for (sector, factor) in factors {
            if fixed.col_index(sector).is_none() {
                return Err(BalanceError::UnknownSector(sector.clone()));
            }
            fixed.scale_col(sector, *factor)?;
        }

        fixed.append_total_row(&self.config.total_row)?;
        fixed.append_total_col(&self.config.total_col)?;
        fixed.recompute_totals();
        debug!(year, corrected = factors.len(), "fixed matrix generated");
        Ok(fixed)
    }

    /// Imbalance of every monitored sector: `total_col[s] - total_row[s]`
    pub fn equilibrium(&self, matrix: &SectorMatrix) -> Result<EquilibriumVector, BalanceError> {
        let entries = self
            .monitored
            .iter()
            .map(|sector| {
                let purchase = matrix.get(sector, &self.config.total_col)?;
                let sale = matrix.get(&self.config.total_row, sector)?;
                Ok((sector.clone(), purchase - sale))
            })
            .collect::<Result<Vec<_>, MatrixError>>()?;
        Ok(EquilibriumVector::new(entries).rounded(self.config.decimal_places))
    }

    /// True when Σ|imbalance| is below the target threshold
    pub fn check_if_balanced(&self, matrix: &SectorMatrix) -> Result<bool, BalanceError> {
        Ok(self.equilibrium(matrix)?.abs_sum() < self.config.target_threshold)
    }

    /// One sequential relaxation pass over the monitored sectors
    ///
    /// `matrix` must carry the configured total row and total column.
    pub fn relax_pass(&self, matrix: &mut SectorMatrix) -> Result<(), BalanceError> {
        for sector in &self.monitored {
            let imbalance = self.equilibrium(matrix)?.get(sector).unwrap_or(0.0);
            let total_i = matrix.get(sector, &self.config.total_col)?;
            let total_j = matrix.get(&self.config.total_row, sector)?;

            if imbalance > 0.0 {
                if total_j != 0.0 {
                    matrix.scale_col(sector, total_i / total_j)?;
                }
            } else if imbalance < 0.0 {
                if total_i != 0.0 {
                    matrix.scale_row(sector, total_j / total_i)?;
                }
            } else {
                continue;
            }

            matrix.recompute_totals();
        }
        Ok(())
    }

    /// Run the full balancing loop for `year`
    pub fn balance(&self, year: &str) -> Result<BalanceOutcome, BalanceError> {
        let mut working = self.fixed_matrix(year)?;
        let mut iterations = 0;
        let mut equilibrium = self.equilibrium(&working)?;
        let mut converged = equilibrium.abs_sum() < self.config.target_threshold;

        while !converged && iterations < self.config.max_iterations {
            self.relax_pass(&mut working)?;
            equilibrium = self.equilibrium(&working)?;
            converged = equilibrium.abs_sum() < self.config.target_threshold;
            iterations += 1;
            debug!(iteration = iterations, residual = equilibrium.abs_sum(), "relaxation pass");
        }

        let residual = equilibrium.abs_sum();
        if converged {
            info!(year, iterations, residual, "flow matrix balanced");
        } else {
            warn!(
                year,
                iterations,
                residual,
                threshold = self.config.target_threshold,
                "flow matrix did not converge"
            );
        }

        if let Some(first) = working.rows().first().cloned() {
            let reference = working.get(&first, &self.config.total_col)?;
            if reference != 0.0 && !reference.is_nan() {
                working.scale(1.0 / reference);
            }
        }

        Ok(BalanceOutcome {
            matrix: working,
            iterations,
            converged,
            residual,
            equilibrium,
        })
    }
}
