//! Core data structures
//!
//! - **matrix**: labeled sector matrix used by every pipeline stage
//! - **snapshot**: JSON save/load of matrices with integrity fingerprint

pub mod matrix;
pub mod snapshot;

pub use matrix::{round_dp, MatrixError, SectorMatrix, TagColumn};
pub use snapshot::MatrixSnapshot;
