//! Cost and Income Matrix Tests

use regional_io_core_rs::assembly::income::{
    EMPLOYED_ROW, GROSS_PROFIT_ROW, SALARY_ROW, VALUE_ADDED_ROW,
};
use regional_io_core_rs::assembly::{AssemblyError, CostConfig, CostMatrix, IncomeMatrices};
use regional_io_core_rs::core::round_dp;
use regional_io_core_rs::{Field, MatrixBuilder, RecordDraft, SectorMatrix, TransactionRecord};

// ============================================================================
// Test Helpers
// ============================================================================

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn sale(seller: &str, buyer: &str, location: &str, value: f64) -> TransactionRecord {
    let mut draft = RecordDraft::new();
    draft.set_if_absent(Field::SellerSectorI, seller);
    draft.set_if_absent(Field::BuyerSectorI, buyer);
    draft.set_if_absent(Field::SellerLocation, location);
    draft.set_if_absent(Field::Product, "Acai");
    draft.set_if_absent(Field::Quantity, 1.0);
    draft.set_if_absent(Field::Value, value);
    draft.validate().unwrap()
}

fn records() -> Vec<TransactionRecord> {
    vec![
        sale("AAProduction", "BFIndustry", "Belem", 300.0),
        sale("AAProduction", "CIRetail", "Belem", 100.0),
        sale("BFIndustry", "CIRetail", "Belem", 200.0),
        sale("CIRetail", "AAProduction", "Belem", 50.0),
        sale("AAProduction", "BFIndustry", "Igarape", 100.0),
    ]
}

fn inputs() -> SectorMatrix {
    SectorMatrix::from_rows(
        labels(&["Belem", "Igarape"]),
        labels(&["Fuel", "Energy"]),
        vec![vec![50.0, 20.0], vec![10.0, 70.0]],
    )
    .unwrap()
}

fn io_table() -> SectorMatrix {
    SectorMatrix::from_rows(
        labels(&["A", "B", "C", "Total"]),
        labels(&["A", "B", "C", "Total"]),
        vec![
            vec![100.0, 10.0, 25.0, 135.0],
            vec![20.0, 90.0, 35.0, 145.0],
            vec![30.0, 40.0, 120.0, 190.0],
            vec![200.0, 180.0, 210.0, 470.0],
        ],
    )
    .unwrap()
}

fn rounded(values: Vec<f64>, n: usize) -> Vec<f64> {
    values[..n].iter().map(|v| round_dp(*v, 6)).collect()
}

// ============================================================================
// Cost Matrix
// ============================================================================

#[test]
fn test_single_location_cost_matrix() {
    let mut cost = CostMatrix::new(inputs(), CostConfig::default());
    cost.set_seller_locations(&MatrixBuilder::default(), &records(), &["Belem"])
        .unwrap();

    // combined GVP: AAProduction 400 + BFIndustry 200 (CIRetail excluded)
    assert_eq!(cost.combined_gvp().unwrap(), 600.0);
    assert_eq!(cost.primary_gvp("Belem").unwrap(), 400.0);

    let c = cost.calculate().unwrap();
    assert_eq!(c.rows(), &labels(&["Fuel", "Energy"])[..]);
    assert_eq!(c.cols(), &labels(&["Belem"])[..]);
    assert_eq!(round_dp(c.value("Fuel", "Belem").unwrap(), 2), round_dp(50.0 / 600.0 * 400.0, 2));
    assert_eq!(round_dp(c.value("Energy", "Belem").unwrap(), 2), 13.33);
}

#[test]
fn test_combined_gvp_spans_locations() {
    let mut cost = CostMatrix::new(inputs(), CostConfig::default());
    cost.set_seller_locations(&MatrixBuilder::default(), &records(), &["Belem", "Igarape"])
        .unwrap();

    assert_eq!(cost.combined_gvp().unwrap(), 700.0);
    let c = cost.calculate().unwrap();
    assert_eq!(c.cols(), &labels(&["Belem", "Igarape"])[..]);
    assert_eq!(round_dp(c.value("Energy", "Igarape").unwrap(), 2), 10.0);
}

#[test]
fn test_location_missing_from_inputs() {
    let mut cost = CostMatrix::new(inputs(), CostConfig::default());
    let err = cost
        .set_seller_locations(&MatrixBuilder::default(), &records(), &["Manaus"])
        .unwrap_err();
    assert_eq!(err, AssemblyError::LocationNotFound("Manaus".to_string()));
}

#[test]
fn test_missing_primary_sector() {
    let config = CostConfig {
        primary_sector: "AAFarming".to_string(),
        ..Default::default()
    };
    let mut cost = CostMatrix::new(inputs(), config);
    cost.set_seller_locations(&MatrixBuilder::default(), &records(), &["Belem"])
        .unwrap();

    assert_eq!(
        cost.calculate().unwrap_err(),
        AssemblyError::SectorNotFound {
            sector: "AAFarming".to_string(),
            location: "Belem".to_string()
        }
    );
}

// ============================================================================
// Income Matrices
// ============================================================================

#[test]
fn test_value_added_row() {
    let mut income = IncomeMatrices::new(io_table(), 3, None, None).unwrap();
    let m = income.value_added().unwrap();

    assert_eq!(m.row_values(VALUE_ADDED_ROW).unwrap()[..3], [65.0, 35.0, 20.0]);
    assert_eq!(m.value(VALUE_ADDED_ROW, "Total"), None);
}

#[test]
fn test_employed_and_salary_rows() {
    let mut income = IncomeMatrices::new(
        io_table(),
        3,
        Some(vec![0.5, 0.6, 0.7]),
        Some(vec![100.0, 120.0, 140.0]),
    )
    .unwrap();
    let m = income.employed_and_salary().unwrap();

    assert_eq!(
        rounded(m.row_values(EMPLOYED_ROW).unwrap(), 3),
        vec![270.0, 241.666667, 271.428571]
    );
    assert_eq!(
        rounded(m.row_values(SALARY_ROW).unwrap(), 3),
        vec![27000.0, 29000.0, 38000.0]
    );
}

#[test]
fn test_gross_profit_computes_prerequisites() {
    let mut income = IncomeMatrices::new(
        io_table(),
        3,
        Some(vec![0.5, 0.6, 0.7]),
        Some(vec![100.0, 120.0, 140.0]),
    )
    .unwrap();
    let m = income.gross_profit().unwrap().clone();

    assert_eq!(
        rounded(m.row_values(GROSS_PROFIT_ROW).unwrap(), 3),
        vec![26935.0, 28965.0, 37980.0]
    );
    assert_eq!(
        m.rows(),
        &labels(&[
            "A",
            "B",
            "C",
            "Total",
            EMPLOYED_ROW,
            SALARY_ROW,
            VALUE_ADDED_ROW,
            GROSS_PROFIT_ROW
        ])[..]
    );
}

#[test]
fn test_appended_rows_do_not_shift_totals() {
    let mut income = IncomeMatrices::new(io_table(), 3, None, None).unwrap();
    income.value_added().unwrap();
    let first = income.matrix().row_values(VALUE_ADDED_ROW).unwrap();

    // recomputing after a row was appended overwrites in place
    income.value_added().unwrap();
    assert_eq!(income.matrix().shape(), (5, 4));
    assert_eq!(income.matrix().row_values(VALUE_ADDED_ROW).unwrap()[..3], first[..3]);
}

#[test]
fn test_gross_profit_without_worker_data() {
    let mut income = IncomeMatrices::new(io_table(), 3, None, None).unwrap();
    assert!(matches!(
        income.gross_profit(),
        Err(AssemblyError::MissingInput(_))
    ));
}

#[test]
fn test_vector_length_checked() {
    let err = IncomeMatrices::new(io_table(), 3, Some(vec![1.0]), None).unwrap_err();
    assert_eq!(
        err,
        AssemblyError::LengthMismatch {
            name: "labor productivity".to_string(),
            len: 1,
            expected: 3
        }
    );
}

#[test]
fn test_gross_profit_from_precomputed_salary() {
    let mut income = IncomeMatrices::new(io_table(), 3, None, None).unwrap();
    let m = income
        .gross_profit_with_salary(&[100.0, 100.0, 100.0])
        .unwrap();

    assert_eq!(m.row_values(GROSS_PROFIT_ROW).unwrap()[..3], [35.0, 65.0, 80.0]);
    // no worker data needed, and no salary row written
    assert!(m.row_index(SALARY_ROW).is_none());
    assert!(m.row_index(VALUE_ADDED_ROW).is_some());
}

#[test]
fn test_precomputed_salary_length_checked() {
    let mut income = IncomeMatrices::new(io_table(), 3, None, None).unwrap();
    assert_eq!(
        income.gross_profit_with_salary(&[1.0, 2.0]).unwrap_err(),
        AssemblyError::LengthMismatch {
            name: "salary".to_string(),
            len: 2,
            expected: 3
        }
    );
}
