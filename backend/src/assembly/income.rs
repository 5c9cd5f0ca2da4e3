//! Income rows for an input-output table
//!
//! The table's upper-left `n × n` block is the sector flow; its last row
//! holds column totals and its last column gross production. Derived rows
//! ("Value Added", "Employed Personnel", "Final Salary", "Gross Profit")
//! are upserted by label over the first `n` columns.
//!
//! Totals are captured at construction, so appending rows never changes
//! which row is "last".

use crate::assembly::AssemblyError;
use crate::core::matrix::SectorMatrix;
use std::collections::BTreeMap;

pub const VALUE_ADDED_ROW: &str = "Value Added";
pub const EMPLOYED_ROW: &str = "Employed Personnel";
pub const SALARY_ROW: &str = "Final Salary";
pub const GROSS_PROFIT_ROW: &str = "Gross Profit";

#[derive(Debug, Clone)]
pub struct IncomeMatrices {
    io: SectorMatrix,
    n: usize,

    /// Last row, first `n` columns
    row_totals: Vec<f64>,

    /// Last column, first `n` rows
    gross_production: Vec<f64>,

    productivity: Option<Vec<f64>>,
    salary: Option<Vec<f64>>,
}

fn check_len(name: &str, values: &Option<Vec<f64>>, expected: usize) -> Result<(), AssemblyError> {
    match values {
        Some(v) if v.len() != expected => Err(AssemblyError::LengthMismatch {
            name: name.to_string(),
            len: v.len(),
            expected,
        }),
        _ => Ok(()),
    }
}

impl IncomeMatrices {
    /// `productivity` is monetary labor productivity per sector, `salary`
    /// the average salary per sector; both are optional but required for
    /// [`employed_and_salary`](Self::employed_and_salary).
    pub fn new(
        io: SectorMatrix,
        n: usize,
        productivity: Option<Vec<f64>>,
        salary: Option<Vec<f64>>,
    ) -> Result<Self, AssemblyError> {
        let (rows, cols) = io.shape();
        let block = rows.min(cols).saturating_sub(1);
        if n > block {
            return Err(AssemblyError::LengthMismatch {
                name: "sector block".to_string(),
                len: n,
                expected: block,
            });
        }
        check_len("labor productivity", &productivity, n)?;
        check_len("average salary", &salary, n)?;

        let row_totals = (0..n).map(|j| io.at(rows - 1, j)).collect();
        let gross_production = (0..n).map(|i| io.at(i, cols - 1)).collect();

        Ok(Self {
            io,
            n,
            row_totals,
            gross_production,
            productivity,
            salary,
        })
    }

    pub fn matrix(&self) -> &SectorMatrix {
        &self.io
    }

    pub fn into_matrix(self) -> SectorMatrix {
        self.io
    }

    fn upsert(&mut self, label: &str, values: &[f64]) -> Result<(), AssemblyError> {
        let row: BTreeMap<String, f64> = self.io.cols()[..self.n]
            .iter()
            .cloned()
            .zip(values.iter().copied())
            .collect();
        self.io.upsert_row(label, &row)?;
        Ok(())
    }

    fn row(&self, label: &str) -> Result<Vec<f64>, AssemblyError> {
        let values = self.io.row_values(label)?;
        Ok(values[..self.n].to_vec())
    }

    /// `|column total − gross production|` per sector
    pub fn value_added(&mut self) -> Result<&SectorMatrix, AssemblyError> {
        let added: Vec<f64> = self
            .row_totals
            .iter()
            .zip(&self.gross_production)
            .map(|(total, gross)| (total - gross).abs())
            .collect();
        self.upsert(VALUE_ADDED_ROW, &added)?;
        Ok(&self.io)
    }

    /// Workers = gross production ÷ productivity; salary mass = workers × salary
    pub fn employed_and_salary(&mut self) -> Result<&SectorMatrix, AssemblyError> {
        let (Some(productivity), Some(salary)) = (&self.productivity, &self.salary) else {
            return Err(AssemblyError::MissingInput(
                "labor productivity and average salary".to_string(),
            ));
        };

        let workers: Vec<f64> = self
            .gross_production
            .iter()
            .zip(productivity)
            .map(|(gross, prod)| if *prod == 0.0 { 0.0 } else { gross / prod })
            .collect();
        let wage_mass: Vec<f64> = workers.iter().zip(salary).map(|(w, s)| w * s).collect();

        self.upsert(EMPLOYED_ROW, &workers)?;
        self.upsert(SALARY_ROW, &wage_mass)?;
        Ok(&self.io)
    }

    /// `|salary − value added|`, computing either row first if absent
    pub fn gross_profit(&mut self) -> Result<&SectorMatrix, AssemblyError> {
        if self.io.row_index(SALARY_ROW).is_none() {
            self.employed_and_salary()?;
        }
        let salary = self.row(SALARY_ROW)?;
        self.profit_from(&salary)
    }

    /// Gross profit from a precomputed salary mass per sector
    ///
    /// The stored salary row, if any, is left as is.
    pub fn gross_profit_with_salary(&mut self, salary: &[f64]) -> Result<&SectorMatrix, AssemblyError> {
        if salary.len() != self.n {
            return Err(AssemblyError::LengthMismatch {
                name: "salary".to_string(),
                len: salary.len(),
                expected: self.n,
            });
        }
        self.profit_from(salary)
    }

    fn profit_from(&mut self, salary: &[f64]) -> Result<&SectorMatrix, AssemblyError> {
        if self.io.row_index(VALUE_ADDED_ROW).is_none() {
            self.value_added()?;
        }

        let added = self.row(VALUE_ADDED_ROW)?;
        let profit: Vec<f64> = salary
            .iter()
            .zip(&added)
            .map(|(s, v)| (s - v).abs())
            .collect();
        self.upsert(GROSS_PROFIT_ROW, &profit)?;
        Ok(&self.io)
    }
}
