//! Matrix Assemblers
//!
//! Combine builder, balancer and forecast outputs into the final economic
//! matrices:
//! - **iom**: forecast input-output matrix (price × quantity)
//! - **cost**: per-location cost matrix from input requirements
//! - **income**: value added, employment, salary and gross profit rows
//! - **export**: quantity flows with an export column, priced
//! - **operator**: per-item cost/consumption/investment matrices
//!
//! # Critical Invariants
//!
//! 1. **Inputs untouched**: assemblers work on their own copies
//! 2. **Zero-fill division**: degenerate divisors yield zeros, never errors

pub mod cost;
pub mod export;
pub mod income;
pub mod iom;
pub mod operator;

pub use cost::{CostConfig, CostMatrix};
pub use export::{ExportInputs, ExportLayout, ExportMatrix};
pub use income::IncomeMatrices;
pub use iom::{ForecastData, InputOutputMatrix, IomResult};
pub use operator::{Incidence, OperatorMode, ParameterOperator, ParameterRow, ParameterTable};

use crate::builder::BuildError;
use crate::core::matrix::MatrixError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AssemblyError {
    #[error("No forecast for product '{product}' in year {year}")]
    ForecastNotFound { product: String, year: String },

    #[error("No matrix registered for product '{0}'")]
    ProductMatrixNotFound(String),

    #[error("Location '{0}' was not found in the inputs")]
    LocationNotFound(String),

    #[error("Sector '{sector}' was not found in the data for location '{location}'")]
    SectorNotFound { sector: String, location: String },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Length of {name} is {len}, expected {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("Invalid mode '{0}': choose 'cost', 'consumption' or 'investment'")]
    InvalidMode(String),

    #[error("Incidence for item '{item}' must be a single number in {mode} mode")]
    InvalidIncidence { item: String, mode: String },

    #[error("Nothing to aggregate")]
    Empty,

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Build(#[from] BuildError),
}
