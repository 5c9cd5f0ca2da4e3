//! Regional Input-Output Core - Rust Engine
//!
//! Aggregates economic circuits of transaction launches into sector
//! input-output matrices for regional accounting.
//!
//! # Architecture
//!
//! - **core**: `SectorMatrix` and its JSON snapshot
//! - **models**: Launch records and circuits
//! - **builder**: Records → quantity/value/price matrices
//! - **balancer**: Iterative flow balancing (Gauss-Seidel relaxation)
//! - **forecast**: Ratio-chained yearly projections
//! - **assembly**: IOM, cost, income, export and parameter matrices
//! - **config**: Pipeline configuration
//!
//! Data flows records → builder → balancer → forecast → assembly.
//!
//! # Critical Invariants
//!
//! 1. Builder matrices are square over the union of seller and buyer sectors
//! 2. Identical inputs produce bitwise-identical matrices
//! 3. Zero divisors yield zeros, never infinities or errors
//! 4. The library logs through `tracing` and never installs a subscriber

// Module declarations
pub mod assembly;
pub mod balancer;
pub mod builder;
pub mod config;
pub mod core;
pub mod forecast;
pub mod models;

// Re-exports for convenience
pub use assembly::{
    AssemblyError, CostConfig, CostMatrix, ExportInputs, ExportLayout, ExportMatrix,
    IncomeMatrices, InputOutputMatrix, IomResult, OperatorMode, ParameterOperator,
};
pub use balancer::{
    BalanceError, BalanceOutcome, BalancerConfig, CorrectionTable, EquilibriumVector, FlowBalancer,
};
pub use builder::{Aggregate, BuildError, BuilderConfig, MatrixBuilder, MatrixFilter, MatrixRequest};
pub use config::{ConfigError, PipelineConfig};
pub use crate::core::{MatrixError, MatrixSnapshot, SectorMatrix};
pub use forecast::{generate_forecast, ForecastError, ForecastSeries, ForecastTable};
pub use models::{
    circuit::{Circuit, CircuitError, CircuitTable},
    record::{Field, FieldValue, RecordDraft, RecordError, TransactionRecord},
};
