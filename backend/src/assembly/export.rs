//! Export matrix assembler
//!
//! Pipeline:
//! 1. quantity flow = parameter matrix × total quantity
//! 2. exported quantity per sector = proportion × export value ÷ implicit price
//! 3. insert the export column before the last column and subtract it from
//!    the domestic-flow column
//! 4. prices × export-price multiplier, with a default export price for
//!    export-eligible sectors
//! 5. final = prices × flow, rounded to 2 places, trimmed, with a row-sum
//!    `Total` column

use crate::assembly::AssemblyError;
use crate::core::matrix::SectorMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label of the appended row-sum column
pub const TOTAL_COLUMN: &str = "Total";

/// Column and row names used by the export pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportLayout {
    pub export_column: String,

    /// Column reduced by the exported quantity
    pub adjust_column: String,

    /// Last row kept in the final matrix
    pub final_row: String,

    /// Last column kept in the final matrix
    pub final_column: String,
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self {
            export_column: "ExportToWorld".to_string(),
            adjust_column: "DomesticFinancialFlow".to_string(),
            final_row: "UrbanRetail".to_string(),
            final_column: "ExportToWorld".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportInputs {
    /// Sector × flow-column coefficients
    pub parameters: SectorMatrix,

    /// Sector × flow-column price formation
    pub prices: SectorMatrix,

    pub total_quantity: f64,

    /// Total export value (USD)
    pub export_value: f64,

    /// Sector → share of the export value
    pub export_proportions: BTreeMap<String, f64>,

    pub implicit_price: f64,

    /// Multiplier applied to every price
    pub export_price: f64,

    /// Price placed in the export column of export-eligible sectors
    pub default_export_value: f64,
}

#[derive(Debug, Clone)]
pub struct ExportMatrix {
    inputs: ExportInputs,
    layout: ExportLayout,
}

impl ExportMatrix {
    pub fn new(inputs: ExportInputs) -> Self {
        Self::with_layout(inputs, ExportLayout::default())
    }

    pub fn with_layout(inputs: ExportInputs, layout: ExportLayout) -> Self {
        Self { inputs, layout }
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    pub fn quantity_flow(&self) -> SectorMatrix {
        let mut flow = self.inputs.parameters.clone();
        flow.scale(self.inputs.total_quantity);
        flow
    }

    /// Sector → physical quantity exported
    pub fn exported_quantity(&self) -> BTreeMap<String, f64> {
        self.inputs
            .export_proportions
            .iter()
            .map(|(sector, share)| {
                let value = share * self.inputs.export_value;
                let quantity = if self.inputs.implicit_price == 0.0 {
                    0.0
                } else {
                    value / self.inputs.implicit_price
                };
                (sector.clone(), quantity)
            })
            .collect()
    }

    /// Insert the export column and net it out of the domestic flow
    ///
    /// Sectors absent from the flow are ignored.
    pub fn adjust_quantity_flow(
        &self,
        flow: &SectorMatrix,
        exported: &BTreeMap<String, f64>,
    ) -> Result<SectorMatrix, AssemblyError> {
        let mut adjusted = flow.clone();
        let at = adjusted.cols().len().saturating_sub(1);
        adjusted.insert_column(at, &self.layout.export_column, 0.0)?;

        for (sector, quantity) in exported {
            if adjusted.row_index(sector).is_some() {
                adjusted.set(sector, &self.layout.export_column, *quantity)?;
            }
        }

        if adjusted.col_index(&self.layout.adjust_column).is_some() {
            let sectors = adjusted.rows().to_vec();
            let exports = adjusted.column_values(&self.layout.export_column)?;
            for (sector, out) in sectors.iter().zip(exports) {
                let domestic = adjusted.get(sector, &self.layout.adjust_column)?;
                adjusted.set(sector, &self.layout.adjust_column, domestic - out)?;
            }
        }
        Ok(adjusted)
    }

    /// Scale prices and add the export column for `sectors`
    pub fn adjust_export_prices(&self, sectors: &[String]) -> Result<SectorMatrix, AssemblyError> {
        let mut prices = self.inputs.prices.clone();
        prices.scale(self.inputs.export_price);

        let at = prices.cols().len().saturating_sub(1);
        prices.insert_column(at, &self.layout.export_column, 0.0)?;
        for sector in sectors {
            if prices.row_index(sector).is_some() {
                prices.set(sector, &self.layout.export_column, self.inputs.default_export_value)?;
            }
        }
        Ok(prices)
    }

    /// Priced export matrix
    pub fn final_export_matrix(
        &self,
        flow: &SectorMatrix,
        prices: &SectorMatrix,
    ) -> Result<SectorMatrix, AssemblyError> {
        let mut product = prices.mul_aligned(flow)?;
        product.round_to(2);

        let trimmed = product.row_index(&self.layout.final_row).is_some()
            && product.col_index(&self.layout.final_column).is_some();
        if trimmed {
            product = product.slice_through(&self.layout.final_row, &self.layout.final_column)?;
        }

        if product.col_index(TOTAL_COLUMN).is_some() {
            product.remove_col(TOTAL_COLUMN)?;
        }
        product.append_total_col(TOTAL_COLUMN)?;
        Ok(product)
    }

    /// Run the whole pipeline
    pub fn calculate(&self) -> Result<SectorMatrix, AssemblyError> {
        let exported = self.exported_quantity();
        let flow = self.adjust_quantity_flow(&self.quantity_flow(), &exported)?;
        let sectors: Vec<String> = exported.keys().cloned().collect();
        let prices = self.adjust_export_prices(&sectors)?;
        self.final_export_matrix(&flow, &prices)
    }
}
