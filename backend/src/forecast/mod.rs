//! Forecast Generator
//!
//! Extrapolates per-row values across years by chaining the ratios of
//! external indexers, anchored at years with a known value.
//!
//! # Algorithm
//!
//! Walking the years left to right with a running value:
//! - an anchor year resets the running value to its correction, discarding
//!   the chain computed so far
//! - years before the first anchor are skipped (no point emitted)
//! - any other year emits `prev * idx[i] / idx[i-1]`
//!
//! A zero previous indexer holds the running value instead of dividing by
//! zero.

use std::collections::BTreeMap;
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ForecastError {
    #[error("Row '{label}' has {len} indexers for {years} years")]
    LengthMismatch {
        label: String,
        len: usize,
        years: usize,
    },

    #[error("Duplicate row label '{0}'")]
    DuplicateRow(String),
}

/// Year columns with one row of indexers per label
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    years: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl ForecastTable {
    pub fn new<Y: Display>(years: impl IntoIterator<Item = Y>) -> Self {
        Self {
            years: years.into_iter().map(|y| y.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row of indexers, one per year
    pub fn add_row(&mut self, label: &str, indexers: Vec<f64>) -> Result<(), ForecastError> {
        if indexers.len() != self.years.len() {
            return Err(ForecastError::LengthMismatch {
                label: label.to_string(),
                len: indexers.len(),
                years: self.years.len(),
            });
        }
        if self.rows.iter().any(|(l, _)| l == label) {
            return Err(ForecastError::DuplicateRow(label.to_string()));
        }
        self.rows.push((label.to_string(), indexers));
        Ok(())
    }

    pub fn with_row(mut self, label: &str, indexers: Vec<f64>) -> Result<Self, ForecastError> {
        self.add_row(label, indexers)?;
        Ok(self)
    }

    pub fn years(&self) -> &[String] {
        &self.years
    }

    pub fn rows(&self) -> &[(String, Vec<f64>)] {
        &self.rows
    }
}

/// Forecast values of one row, in year order
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    pub label: String,
    pub points: Vec<(String, f64)>,
}

impl ForecastSeries {
    pub fn value(&self, year: impl Display) -> Option<f64> {
        let year = year.to_string();
        self.points.iter().find(|(y, _)| *y == year).map(|(_, v)| *v)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Year → value
    pub fn to_year_map(&self) -> BTreeMap<String, f64> {
        self.points.iter().cloned().collect()
    }
}

/// Forecast every row of `table` from the anchor values in `corrections`
///
/// # Example
///
/// ```rust
/// use regional_io_core_rs::forecast::{generate_forecast, ForecastTable};
/// use std::collections::BTreeMap;
///
/// let table = ForecastTable::new([2025, 2026, 2027])
///     .with_row("GVP", vec![1.0, 1.1, 1.2])
///     .unwrap();
/// let corrections = BTreeMap::from([("2025".to_string(), 100.0)]);
///
/// let series = generate_forecast(&table, &corrections);
/// let values = series[0].values();
/// assert!((values[1] - 110.0).abs() < 1e-9);
/// assert!((values[2] - 120.0).abs() < 1e-9);
/// ```
pub fn generate_forecast(
    table: &ForecastTable,
    corrections: &BTreeMap<String, f64>,
) -> Vec<ForecastSeries> {
    table
        .rows
        .iter()
        .map(|(label, indexers)| {
            let mut points = Vec::with_capacity(table.years.len());
            let mut current: Option<f64> = None;

            for (i, year) in table.years.iter().enumerate() {
                if let Some(anchor) = corrections.get(year) {
                    current = Some(*anchor);
                } else if let Some(prev) = current {
                    let previous_idx = if i > 0 { indexers[i - 1] } else { 0.0 };
                    if previous_idx != 0.0 {
                        current = Some(prev * indexers[i] / previous_idx);
                    }
                } else {
                    continue;
                }
                if let Some(v) = current {
                    points.push((year.clone(), v));
                }
            }

            ForecastSeries {
                label: label.clone(),
                points,
            }
        })
        .collect()
}
