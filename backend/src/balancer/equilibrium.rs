//! Equilibrium vector
//!
//! Signed per-sector imbalance between what a sector purchases (its cell in
//! the total column) and what it sells (its cell in the total row).

use crate::core::matrix::round_dp;

/// Imbalance per monitored sector, in declaration order
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EquilibriumVector {
    entries: Vec<(String, f64)>,
}

impl EquilibriumVector {
    pub(crate) fn new(entries: Vec<(String, f64)>) -> Self {
        Self { entries }
    }

    /// Rounded imbalance of one sector
    pub fn get(&self, sector: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(label, _)| label == sector)
            .map(|(_, v)| *v)
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Σ|e|
    pub fn abs_sum(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v.abs()).sum()
    }

    /// Re-round every entry
    pub(crate) fn rounded(mut self, decimal_places: u32) -> Self {
        for (_, v) in &mut self.entries {
            *v = round_dp(*v, decimal_places);
        }
        self
    }
}
