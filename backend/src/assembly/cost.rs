//! Cost matrix assembler
//!
//! For each seller location with input requirements `I` (one value per
//! item):
//!
//! ```text
//! T = I / y      y: combined GVP of every GVP-prefixed sector, all locations
//! C = T * Y      Y: total sold by the primary-production sector at the location
//! ```
//!
//! The result has one row per item and one column per location.

use crate::assembly::AssemblyError;
use crate::builder::{MatrixBuilder, MatrixFilter};
use crate::core::matrix::SectorMatrix;
use crate::models::record::TransactionRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sector conventions used by the cost matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    /// Sector whose total sold is the location GVP
    pub primary_sector: String,

    /// Prefixes of sectors counted in the combined GVP
    pub gvp_prefixes: Vec<String>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            primary_sector: "AAProduction".to_string(),
            gvp_prefixes: vec!["A".to_string(), "B".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct CostMatrix {
    /// Locations × items
    inputs: SectorMatrix,
    config: CostConfig,

    /// Value matrices in location order
    value_matrices: Vec<(String, SectorMatrix)>,
}

impl CostMatrix {
    pub fn new(inputs: SectorMatrix, config: CostConfig) -> Self {
        Self {
            inputs,
            config,
            value_matrices: Vec::new(),
        }
    }

    pub fn locations(&self) -> Vec<&str> {
        self.value_matrices.iter().map(|(l, _)| l.as_str()).collect()
    }

    fn require_input_row(&self, location: &str) -> Result<(), AssemblyError> {
        self.inputs
            .row_index(location)
            .map(|_| ())
            .ok_or_else(|| AssemblyError::LocationNotFound(location.to_string()))
    }

    /// Build a value matrix per seller location from launch records
    pub fn set_seller_locations(
        &mut self,
        builder: &MatrixBuilder,
        records: &[TransactionRecord],
        locations: &[&str],
    ) -> Result<(), AssemblyError> {
        let mut matrices = Vec::with_capacity(locations.len());
        for location in locations {
            self.require_input_row(location)?;
            let value = builder.value(records, &MatrixFilter::seller_location(location))?;
            matrices.push((location.to_string(), value));
        }
        self.value_matrices = matrices;
        debug!(locations = locations.len(), "seller locations set");
        Ok(())
    }

    /// Use precomputed value matrices (each must carry a total column)
    pub fn with_value_matrices(
        mut self,
        matrices: Vec<(String, SectorMatrix)>,
    ) -> Result<Self, AssemblyError> {
        for (location, _) in &matrices {
            self.require_input_row(location)?;
        }
        self.value_matrices = matrices;
        Ok(self)
    }

    fn total_sold(matrix: &SectorMatrix, location: &str) -> Result<String, AssemblyError> {
        matrix
            .total_col()
            .map(str::to_string)
            .ok_or_else(|| AssemblyError::MissingInput(format!("total column of value matrix for {}", location)))
    }

    /// Total sold by the primary-production sector at `location`
    pub fn primary_gvp(&self, location: &str) -> Result<f64, AssemblyError> {
        let (_, matrix) = self
            .value_matrices
            .iter()
            .find(|(l, _)| l == location)
            .ok_or_else(|| AssemblyError::LocationNotFound(location.to_string()))?;
        let sold = Self::total_sold(matrix, location)?;
        matrix
            .value(&self.config.primary_sector, &sold)
            .ok_or_else(|| AssemblyError::SectorNotFound {
                sector: self.config.primary_sector.clone(),
                location: location.to_string(),
            })
    }

    /// Total sold by every GVP-prefixed sector across all locations
    pub fn combined_gvp(&self) -> Result<f64, AssemblyError> {
        let mut total = 0.0;
        for (location, matrix) in &self.value_matrices {
            let sold = Self::total_sold(matrix, location)?;
            for sector in matrix.body_rows() {
                if self.config.gvp_prefixes.iter().any(|p| sector.starts_with(p.as_str())) {
                    total += matrix.value(sector, &sold).unwrap_or(0.0);
                }
            }
        }
        Ok(total)
    }

    /// Items × locations cost matrix
    pub fn calculate(&self) -> Result<SectorMatrix, AssemblyError> {
        if self.value_matrices.is_empty() {
            return Err(AssemblyError::MissingInput("seller locations".to_string()));
        }

        let combined = self.combined_gvp()?;
        let items = self.inputs.cols().to_vec();
        let locations: Vec<String> = self.value_matrices.iter().map(|(l, _)| l.clone()).collect();
        let mut cost = SectorMatrix::zeros(items.clone(), locations.clone())?;

        for location in &locations {
            let primary = self.primary_gvp(location)?;
            let requirements = self.inputs.row_values(location)?;
            for (item, input) in items.iter().zip(requirements) {
                let share = if combined == 0.0 { 0.0 } else { input / combined };
                cost.set(item, location, share * primary)?;
            }
        }

        debug!(combined_gvp = combined, locations = locations.len(), "cost matrix calculated");
        Ok(cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unknown_location_rejected() {
        let inputs =
            SectorMatrix::from_rows(labels(&["North"]), labels(&["Fuel"]), vec![vec![1.0]]).unwrap();
        let value = SectorMatrix::square(labels(&["AAProduction"])).unwrap();
        let err = CostMatrix::new(inputs, CostConfig::default())
            .with_value_matrices(vec![("South".to_string(), value)])
            .unwrap_err();
        assert_eq!(err, AssemblyError::LocationNotFound("South".to_string()));
    }

    #[test]
    fn test_calculate_requires_locations() {
        let inputs =
            SectorMatrix::from_rows(labels(&["North"]), labels(&["Fuel"]), vec![vec![1.0]]).unwrap();
        let err = CostMatrix::new(inputs, CostConfig::default()).calculate().unwrap_err();
        assert!(matches!(err, AssemblyError::MissingInput(_)));
    }
}
