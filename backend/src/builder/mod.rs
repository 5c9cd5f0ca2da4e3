//! Matrix Builder
//!
//! Pivots flat launch records into square sector × sector matrices.
//!
//! # Overview
//!
//! 1. Filter records by product and/or a single seller or buyer location
//! 2. Group by (seller sector, buyer sector) and aggregate one numeric field
//! 3. Reindex to the sorted union of seller and buyer sectors, zero-filled,
//!    so sectors that only buy or only sell still get a row and a column
//! 4. Optionally append `Total{Field}Bought` (column sums) and
//!    `Total{Field}Sold` (row sums); their shared corner stays undefined
//!
//! Derived matrices (parametric, implicit price, pricing) are built on top
//! of the quantity and value matrices.
//!
//! # Critical Invariants
//!
//! 1. **Square output**: body row labels == body column labels
//! 2. **Determinism**: identical inputs produce bitwise-identical matrices
//! 3. **No infinities**: zero divisors produce zeros

use crate::core::matrix::{MatrixError, SectorMatrix};
use crate::models::record::{Field, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Total row label given to implicit-price matrices
pub const IMPLICIT_PRICE_BOUGHT: &str = "TotalImplicitPriceBought";

/// Total column label given to implicit-price matrices
pub const IMPLICIT_PRICE_SOLD: &str = "TotalImplicitPriceSold";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("The selected product {0} was not found in the records")]
    ProductNotFound(String),

    #[error("No record has {field} equal to {location}")]
    LocationNotFound { field: Field, location: String },

    #[error("Invalid aggregate method '{0}': choose 'sum', 'mean' or 'median'")]
    InvalidAggregate(String),

    #[error("Cannot filter by both seller and buyer locations simultaneously")]
    ConflictingLocations,

    #[error("Either a product or one location (seller or buyer) must be specified")]
    MissingFilter,

    #[error("Field {0} holds a non-numeric value")]
    NonNumericField(Field),

    #[error(transparent)]
    Matrix(#[from] MatrixError),
}

// ============================================================================
// Configuration
// ============================================================================

/// Which record fields the builder reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Row axis (selling sector)
    pub seller_sector: Field,

    /// Column axis (buying sector)
    pub buyer_sector: Field,

    pub seller_location: Field,
    pub buyer_location: Field,
    pub product: Field,
    pub quantity: Field,
    pub value: Field,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            seller_sector: Field::SellerSectorI,
            buyer_sector: Field::BuyerSectorI,
            seller_location: Field::SellerLocation,
            buyer_location: Field::BuyerLocation,
            product: Field::Product,
            quantity: Field::Quantity,
            value: Field::Value,
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// Aggregation applied to each (seller, buyer) group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Sum,
    Mean,
    Median,
}

impl FromStr for Aggregate {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregate::Sum),
            "mean" => Ok(Aggregate::Mean),
            "median" => Ok(Aggregate::Median),
            other => Err(BuildError::InvalidAggregate(other.to_string())),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::Sum => "sum",
            Aggregate::Mean => "mean",
            Aggregate::Median => "median",
        };
        f.write_str(name)
    }
}

impl Aggregate {
    fn apply(&self, values: &mut [f64]) -> f64 {
        match self {
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
        }
    }
}

/// Record selection shared by all matrix kinds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatrixFilter {
    pub product: Option<String>,
    pub seller_location: Option<String>,
    pub buyer_location: Option<String>,
}

impl MatrixFilter {
    pub fn product(product: &str) -> Self {
        Self {
            product: Some(product.to_string()),
            ..Default::default()
        }
    }

    pub fn seller_location(location: &str) -> Self {
        Self {
            seller_location: Some(location.to_string()),
            ..Default::default()
        }
    }

    pub fn buyer_location(location: &str) -> Self {
        Self {
            buyer_location: Some(location.to_string()),
            ..Default::default()
        }
    }

    pub fn with_seller_location(mut self, location: &str) -> Self {
        self.seller_location = Some(location.to_string());
        self
    }

    pub fn with_buyer_location(mut self, location: &str) -> Self {
        self.buyer_location = Some(location.to_string());
        self
    }
}

/// Full description of one matrix to build
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRequest {
    pub filter: MatrixFilter,

    /// Numeric field aggregated into the cells
    pub metric: Field,

    pub aggregate: Aggregate,

    /// Append `Total{metric}Bought` / `Total{metric}Sold`
    pub insert_total: bool,
}

impl MatrixRequest {
    pub fn new(filter: MatrixFilter, metric: Field) -> Self {
        Self {
            filter,
            metric,
            aggregate: Aggregate::Sum,
            insert_total: true,
        }
    }

    pub fn with_aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn without_totals(mut self) -> Self {
        self.insert_total = false;
        self
    }
}

/// Label of the total row appended for `metric`
pub fn bought_label(metric: Field) -> String {
    format!("Total{}Bought", metric)
}

/// Label of the total column appended for `metric`
pub fn sold_label(metric: Field) -> String {
    format!("Total{}Sold", metric)
}

// ============================================================================
// Builder
// ============================================================================

/// Builds sector matrices from launch records
///
/// # Example
///
/// ```rust
/// use regional_io_core_rs::builder::{MatrixBuilder, MatrixFilter};
/// use regional_io_core_rs::models::record::{Field, RecordDraft};
///
/// let mut draft = RecordDraft::new();
/// draft.set_if_absent(Field::SellerSectorI, "Farm");
/// draft.set_if_absent(Field::BuyerSectorI, "Mill");
/// draft.set_if_absent(Field::Product, "Grain");
/// draft.set_if_absent(Field::Quantity, 10.0);
/// draft.set_if_absent(Field::Value, 50.0);
/// let records = vec![draft.validate().unwrap()];
///
/// let builder = MatrixBuilder::default();
/// let q = builder.quantity(&records, &MatrixFilter::product("Grain")).unwrap();
/// assert_eq!(q.value("Farm", "Mill"), Some(10.0));
/// assert_eq!(q.value("Mill", "Farm"), Some(0.0));
/// assert!(q.is_square());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MatrixBuilder {
    config: BuilderConfig,
}

impl MatrixBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Apply a filter, enforcing the argument rules
    fn select<'a>(
        &self,
        records: &'a [TransactionRecord],
        filter: &MatrixFilter,
    ) -> Result<Vec<&'a TransactionRecord>, BuildError> {
        if filter.seller_location.is_some() && filter.buyer_location.is_some() {
            return Err(BuildError::ConflictingLocations);
        }
        if filter.product.is_none()
            && filter.seller_location.is_none()
            && filter.buyer_location.is_none()
        {
            return Err(BuildError::MissingFilter);
        }

        let mut selected: Vec<&TransactionRecord> = records.iter().collect();

        if let Some(product) = &filter.product {
            selected.retain(|r| r.text(self.config.product) == Some(product.as_str()));
            if selected.is_empty() {
                return Err(BuildError::ProductNotFound(product.clone()));
            }
        }

        let location = match (&filter.seller_location, &filter.buyer_location) {
            (Some(loc), None) => Some((self.config.seller_location, loc)),
            (None, Some(loc)) => Some((self.config.buyer_location, loc)),
            _ => None,
        };
        if let Some((field, loc)) = location {
            selected.retain(|r| r.text(field) == Some(loc.as_str()));
            if selected.is_empty() {
                return Err(BuildError::LocationNotFound {
                    field,
                    location: loc.clone(),
                });
            }
        }

        debug!(
            product = ?filter.product,
            seller_location = ?filter.seller_location,
            buyer_location = ?filter.buyer_location,
            selected = selected.len(),
            "records filtered"
        );
        Ok(selected)
    }

    /// Build one matrix
    pub fn build(
        &self,
        records: &[TransactionRecord],
        request: &MatrixRequest,
    ) -> Result<SectorMatrix, BuildError> {
        let selected = self.select(records, &request.filter)?;

        let mut groups: BTreeMap<(String, String), Vec<f64>> = BTreeMap::new();
        let mut sectors: BTreeSet<String> = BTreeSet::new();

        for record in selected {
            let (Some(seller), Some(buyer)) = (
                record.text(self.config.seller_sector),
                record.text(self.config.buyer_sector),
            ) else {
                continue;
            };
            let Some(raw) = record.get(request.metric) else {
                continue;
            };
            let value = raw
                .as_number()
                .ok_or(BuildError::NonNumericField(request.metric))?;

            sectors.insert(seller.to_string());
            sectors.insert(buyer.to_string());
            groups
                .entry((seller.to_string(), buyer.to_string()))
                .or_default()
                .push(value);
        }

        let labels: Vec<String> = sectors.into_iter().collect();
        let mut matrix = SectorMatrix::square(labels)?;
        for ((seller, buyer), mut values) in groups {
            let cell = request.aggregate.apply(&mut values);
            matrix.set(&seller, &buyer, cell)?;
        }

        if request.insert_total {
            matrix.append_total_row(&bought_label(request.metric))?;
            matrix.append_total_col(&sold_label(request.metric))?;
        }

        debug!(
            metric = %request.metric,
            aggregate = %request.aggregate,
            sectors = matrix.body_rows().len(),
            "matrix built"
        );
        Ok(matrix)
    }

    /// Summed quantity matrix with totals
    pub fn quantity(
        &self,
        records: &[TransactionRecord],
        filter: &MatrixFilter,
    ) -> Result<SectorMatrix, BuildError> {
        self.build(records, &MatrixRequest::new(filter.clone(), self.config.quantity))
    }

    /// Summed value matrix with totals
    pub fn value(
        &self,
        records: &[TransactionRecord],
        filter: &MatrixFilter,
    ) -> Result<SectorMatrix, BuildError> {
        self.build(records, &MatrixRequest::new(filter.clone(), self.config.value))
    }

    /// Quantity matrix divided by the second-largest sector total sold
    ///
    /// The largest seller is the primary-production sector by convention and
    /// is excluded from the divisor. With a single sector its own total is
    /// used; a zero divisor yields an all-zero matrix.
    pub fn parametric(
        &self,
        records: &[TransactionRecord],
        filter: &MatrixFilter,
    ) -> Result<SectorMatrix, BuildError> {
        let mut matrix = self.quantity(records, filter)?;

        let sold = sold_label(self.config.quantity);
        let mut totals: Vec<f64> = matrix
            .body_rows()
            .into_iter()
            .filter_map(|row| matrix.value(row, &sold))
            .collect();
        totals.sort_by(|a, b| b.total_cmp(a));

        let divisor = totals.get(1).or_else(|| totals.first()).copied().unwrap_or(0.0);
        debug!(divisor, "parametric divisor selected");

        if divisor == 0.0 {
            matrix.map_cells(|v| if v.is_nan() { v } else { 0.0 });
        } else {
            matrix.scale(1.0 / divisor);
        }
        Ok(matrix)
    }

    /// Value ÷ quantity per sector pair, zero where quantity is zero
    pub fn implicit_price(
        &self,
        records: &[TransactionRecord],
        filter: &MatrixFilter,
        insert_total: bool,
    ) -> Result<SectorMatrix, BuildError> {
        let mut qty_request = MatrixRequest::new(filter.clone(), self.config.quantity);
        let mut val_request = MatrixRequest::new(filter.clone(), self.config.value);
        qty_request.insert_total = insert_total;
        val_request.insert_total = insert_total;

        let mut qty = self.build(records, &qty_request)?;
        let mut val = self.build(records, &val_request)?;

        if insert_total {
            qty.rename_row(&bought_label(self.config.quantity), IMPLICIT_PRICE_BOUGHT)?;
            qty.rename_col(&sold_label(self.config.quantity), IMPLICIT_PRICE_SOLD)?;
            val.rename_row(&bought_label(self.config.value), IMPLICIT_PRICE_BOUGHT)?;
            val.rename_col(&sold_label(self.config.value), IMPLICIT_PRICE_SOLD)?;
        }

        let val = val.reindex(qty.rows(), qty.cols(), 0.0)?;
        Ok(val.div_zero_fill(&qty)?)
    }

    /// Implicit price matrix normalized by the mean of its first row
    pub fn pricing(
        &self,
        records: &[TransactionRecord],
        filter: &MatrixFilter,
    ) -> Result<SectorMatrix, BuildError> {
        let mut matrix = self.implicit_price(records, filter, false)?;

        let first_row = matrix
            .rows()
            .first()
            .map(|label| matrix.row_values(label))
            .transpose()?
            .unwrap_or_default();
        let mean = if first_row.is_empty() {
            0.0
        } else {
            first_row.iter().sum::<f64>() / first_row.len() as f64
        };

        if mean == 0.0 {
            matrix.map_cells(|_| 0.0);
        } else {
            matrix.scale(1.0 / mean);
        }
        Ok(matrix)
    }
}
