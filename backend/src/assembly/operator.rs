//! Parameter operator
//!
//! Builds one square sector matrix per item from a parameter table:
//!
//! ```text
//! M[item] = params(item rows) × coefficient[item] × incidence[item]
//! ```
//!
//! reindexed to the full sector set with zero fill. In investment mode the
//! incidence is a growth series and only a new historical record counts.

use crate::assembly::AssemblyError;
use crate::core::matrix::SectorMatrix;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorMode {
    Cost,
    Consumption,
    Investment,
}

impl FromStr for OperatorMode {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost" => Ok(OperatorMode::Cost),
            "consumption" => Ok(OperatorMode::Consumption),
            "investment" => Ok(OperatorMode::Investment),
            other => Err(AssemblyError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OperatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperatorMode::Cost => "cost",
            OperatorMode::Consumption => "consumption",
            OperatorMode::Investment => "investment",
        };
        f.write_str(name)
    }
}

/// Incidence of one item
#[derive(Debug, Clone, PartialEq)]
pub enum Incidence {
    Scalar(f64),

    /// Chronological growth rates
    Series(Vec<f64>),
}

impl Incidence {
    /// Last growth rate if it beats every earlier one, else 0
    fn latest_record(&self) -> f64 {
        match self {
            Incidence::Scalar(v) => *v,
            Incidence::Series(series) => match series.split_last() {
                None => 0.0,
                Some((last, prev)) => {
                    let record = prev.iter().all(|p| last > p);
                    if record {
                        *last
                    } else {
                        0.0
                    }
                }
            },
        }
    }
}

/// One parameter row: the coefficients an item draws from `sector`
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    pub item: String,
    pub sector: String,

    /// One value per table sector
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTable {
    sectors: Vec<String>,
    rows: Vec<ParameterRow>,
}

impl ParameterTable {
    pub fn new(sectors: Vec<String>) -> Self {
        Self {
            sectors,
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, item: &str, sector: &str, values: Vec<f64>) -> Result<(), AssemblyError> {
        if values.len() != self.sectors.len() {
            return Err(AssemblyError::LengthMismatch {
                name: format!("parameters of {}/{}", item, sector),
                len: values.len(),
                expected: self.sectors.len(),
            });
        }
        self.rows.push(ParameterRow {
            item: item.to_string(),
            sector: sector.to_string(),
            values,
        });
        Ok(())
    }

    pub fn sectors(&self) -> &[String] {
        &self.sectors
    }

    pub fn rows_for<'a>(&'a self, item: &'a str) -> impl Iterator<Item = &'a ParameterRow> + 'a {
        self.rows.iter().filter(move |r| r.item == item)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterOperator {
    params: ParameterTable,

    /// Item → coefficient
    coefficients: BTreeMap<String, f64>,

    mode: OperatorMode,
}

impl ParameterOperator {
    pub fn new(params: ParameterTable, coefficients: BTreeMap<String, f64>, mode: OperatorMode) -> Self {
        Self {
            params,
            coefficients,
            mode,
        }
    }

    pub fn mode(&self) -> OperatorMode {
        self.mode
    }

    /// One matrix per item
    ///
    /// Items missing from `incidence`, the parameter table or the
    /// coefficients are skipped, as are items whose effective incidence is
    /// zero.
    pub fn calculate(
        &self,
        items: &[&str],
        incidence: &BTreeMap<String, Incidence>,
    ) -> Result<BTreeMap<String, SectorMatrix>, AssemblyError> {
        let sectors = self.params.sectors().to_vec();
        let mut results = BTreeMap::new();
        let mut skipped = Vec::new();

        for item in items {
            let rows: Vec<&ParameterRow> = self.params.rows_for(item).collect();
            let (Some(raw), Some(coefficient), false) = (
                incidence.get(*item),
                self.coefficients.get(*item),
                rows.is_empty(),
            ) else {
                skipped.push(item.to_string());
                continue;
            };

            let factor = match (self.mode, raw) {
                (OperatorMode::Investment, inc) => inc.latest_record(),
                (_, Incidence::Scalar(v)) => *v,
                (mode, Incidence::Series(_)) => {
                    return Err(AssemblyError::InvalidIncidence {
                        item: item.to_string(),
                        mode: mode.to_string(),
                    })
                }
            };
            if factor == 0.0 {
                debug!(item, "zero incidence, item skipped");
                continue;
            }

            let row_labels: Vec<String> = rows.iter().map(|r| r.sector.clone()).collect();
            let values: Vec<Vec<f64>> = rows
                .iter()
                .map(|r| r.values.iter().map(|v| v * coefficient * factor).collect())
                .collect();
            let adjusted = SectorMatrix::from_rows(row_labels, sectors.clone(), values)?;
            results.insert(item.to_string(), adjusted.reindex(&sectors, &sectors, 0.0)?);
        }

        if !skipped.is_empty() {
            warn!(items = %skipped.join(", "), "unable to calculate matrix for items");
        }
        Ok(results)
    }

    /// Element-wise sum of every item matrix
    pub fn aggregate(results: &BTreeMap<String, SectorMatrix>) -> Result<SectorMatrix, AssemblyError> {
        let mut iter = results.values();
        let mut total = iter.next().ok_or(AssemblyError::Empty)?.clone();
        for matrix in iter {
            let aligned = matrix.reindex(total.rows(), total.cols(), 0.0)?;
            for i in 0..total.shape().0 {
                for j in 0..total.shape().1 {
                    total.set_at(i, j, total.at(i, j) + aligned.at(i, j));
                }
            }
        }
        Ok(total)
    }
}
