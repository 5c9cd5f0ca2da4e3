//! Input-Output Matrix assembler
//!
//! For a product and year: the implied price is the value forecast divided
//! by the quantity forecast; the product's price-formation matrix is scaled
//! by that price, its parametric matrix by the quantity forecast, and the
//! value matrix is their element-wise product.

use crate::assembly::AssemblyError;
use crate::core::matrix::SectorMatrix;
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::debug;

/// Product → (year → forecast value)
pub type ForecastData = BTreeMap<String, BTreeMap<String, f64>>;

/// All matrices produced for one product and year
#[derive(Debug, Clone)]
pub struct IomResult {
    pub implied_price: f64,
    pub price_matrix: SectorMatrix,
    pub quantity_matrix: SectorMatrix,
    pub value_matrix: SectorMatrix,
}

#[derive(Debug, Clone)]
pub struct InputOutputMatrix {
    value_forecast: ForecastData,
    quantity_forecast: ForecastData,
    parametric: BTreeMap<String, SectorMatrix>,
    price_formation: BTreeMap<String, SectorMatrix>,
}

impl InputOutputMatrix {
    pub fn new(
        value_forecast: ForecastData,
        quantity_forecast: ForecastData,
        parametric: BTreeMap<String, SectorMatrix>,
        price_formation: BTreeMap<String, SectorMatrix>,
    ) -> Self {
        Self {
            value_forecast,
            quantity_forecast,
            parametric,
            price_formation,
        }
    }

    /// Multiply every numeric cell by `reference`; tag columns ride along
    pub fn reference_matrix(reference: f64, matrix: &SectorMatrix) -> SectorMatrix {
        let mut scaled = matrix.clone();
        scaled.scale(reference);
        scaled
    }

    /// Element-wise price × quantity over their common labels
    ///
    /// Tag columns come from the price matrix.
    pub fn value_matrix(
        price: &SectorMatrix,
        quantity: &SectorMatrix,
    ) -> Result<SectorMatrix, AssemblyError> {
        Ok(price.mul_aligned(quantity)?)
    }

    fn forecast(
        data: &ForecastData,
        product: &str,
        year: &str,
    ) -> Result<f64, AssemblyError> {
        data.get(product)
            .and_then(|years| years.get(year))
            .copied()
            .ok_or_else(|| AssemblyError::ForecastNotFound {
                product: product.to_string(),
                year: year.to_string(),
            })
    }

    /// Build the IOM of `product` for `year`
    ///
    /// # Example
    ///
    /// ```rust
    /// use regional_io_core_rs::assembly::InputOutputMatrix;
    /// use regional_io_core_rs::SectorMatrix;
    /// use std::collections::BTreeMap;
    ///
    /// let unit = SectorMatrix::from_rows(
    ///     vec!["A".to_string()],
    ///     vec!["A".to_string()],
    ///     vec![vec![1.0]],
    /// )
    /// .unwrap();
    /// let years = |v: f64| BTreeMap::from([("2023".to_string(), v)]);
    ///
    /// let iom = InputOutputMatrix::new(
    ///     BTreeMap::from([("productA".to_string(), years(200.0))]),
    ///     BTreeMap::from([("productA".to_string(), years(10.0))]),
    ///     BTreeMap::from([("productA".to_string(), unit.clone())]),
    ///     BTreeMap::from([("productA".to_string(), unit)]),
    /// );
    /// let result = iom.generate_iom("productA", 2023).unwrap();
    /// assert_eq!(result.implied_price, 20.0);
    /// assert_eq!(result.value_matrix.value("A", "A"), Some(200.0));
    /// ```
    pub fn generate_iom(&self, product: &str, year: impl Display) -> Result<IomResult, AssemblyError> {
        let year = year.to_string();
        let value = Self::forecast(&self.value_forecast, product, &year)?;
        let quantity = Self::forecast(&self.quantity_forecast, product, &year)?;
        let implied_price = if quantity == 0.0 { 0.0 } else { value / quantity };

        let price_formation = self
            .price_formation
            .get(product)
            .ok_or_else(|| AssemblyError::ProductMatrixNotFound(product.to_string()))?;
        let parametric = self
            .parametric
            .get(product)
            .ok_or_else(|| AssemblyError::ProductMatrixNotFound(product.to_string()))?;

        let price_matrix = Self::reference_matrix(implied_price, price_formation);
        let quantity_matrix = Self::reference_matrix(quantity, parametric);
        let value_matrix = Self::value_matrix(&price_matrix, &quantity_matrix)?;

        debug!(product, year = %year, implied_price, "input-output matrix generated");
        Ok(IomResult {
            implied_price,
            price_matrix,
            quantity_matrix,
            value_matrix,
        })
    }
}
