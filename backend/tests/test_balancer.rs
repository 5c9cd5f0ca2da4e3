//! Flow Balancer Tests
//!
//! Initialization with corrections, sequential relaxation, convergence
//! reporting and normalization.

use proptest::prelude::*;
use regional_io_core_rs::{
    BalanceError, BalancerConfig, CorrectionTable, FlowBalancer, SectorMatrix,
};
use std::collections::BTreeMap;

// ============================================================================
// Test Helpers
// ============================================================================

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Square flow block plus zeroed `Totalj` row and `Totali` column
fn flow_matrix(sectors: &[&str], body: Vec<Vec<f64>>) -> SectorMatrix {
    let mut rows = labels(sectors);
    rows.push("Totalj".to_string());
    let mut cols = labels(sectors);
    cols.push("Totali".to_string());

    let mut values: Vec<Vec<f64>> = body
        .into_iter()
        .map(|mut row| {
            row.push(0.0);
            row
        })
        .collect();
    values.push(vec![0.0; cols.len()]);
    SectorMatrix::from_rows(rows, cols, values).unwrap()
}

fn corrections(year: &str, factors: &[(&str, f64)]) -> CorrectionTable {
    let inner: BTreeMap<String, f64> = factors
        .iter()
        .map(|(s, f)| (s.to_string(), *f))
        .collect();
    BTreeMap::from([(year.to_string(), inner)])
}

fn balancer(sectors: &[&str], body: Vec<Vec<f64>>, config: BalancerConfig) -> FlowBalancer {
    FlowBalancer::new(
        flow_matrix(sectors, body),
        labels(sectors),
        corrections("2020", &[]),
        config,
    )
    .unwrap()
}

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_fixed_matrix_applies_corrections_and_totals() {
    let b = FlowBalancer::new(
        flow_matrix(&["A", "B"], vec![vec![6.0, 4.0], vec![2.0, 8.0]]),
        labels(&["A", "B"]),
        corrections("2021", &[("B", 0.5)]),
        BalancerConfig::default(),
    )
    .unwrap();

    let fixed = b.fixed_matrix("2021").unwrap();
    assert_eq!(fixed.row_values("A").unwrap(), vec![6.0, 2.0, 8.0]);
    assert_eq!(fixed.row_values("B").unwrap(), vec![2.0, 4.0, 6.0]);
    // corner holds the grand total
    assert_eq!(fixed.row_values("Totalj").unwrap(), vec![8.0, 6.0, 14.0]);
}

#[test]
fn test_missing_correction_year() {
    let b = balancer(&["A"], vec![vec![1.0]], BalancerConfig::default());
    assert_eq!(
        b.fixed_matrix("1999").unwrap_err(),
        BalanceError::MissingCorrectionYear("1999".to_string())
    );
}

#[test]
fn test_correction_for_unknown_sector() {
    let b = FlowBalancer::new(
        flow_matrix(&["A"], vec![vec![1.0]]),
        labels(&["A"]),
        corrections("2020", &[("Z", 2.0)]),
        BalancerConfig::default(),
    )
    .unwrap();
    assert_eq!(
        b.balance("2020").unwrap_err(),
        BalanceError::UnknownSector("Z".to_string())
    );
}

#[test]
fn test_custom_total_labels_required() {
    let config = BalancerConfig {
        total_col: "Purchases".to_string(),
        ..Default::default()
    };
    let err = FlowBalancer::new(
        flow_matrix(&["A"], vec![vec![1.0]]),
        labels(&["A"]),
        CorrectionTable::new(),
        config,
    )
    .unwrap_err();
    assert_eq!(err, BalanceError::MissingTotalCol("Purchases".to_string()));
}

// ============================================================================
// Relaxation
// ============================================================================

#[test]
fn test_negative_imbalance_scales_row() {
    // A purchases 10 but sells 15; B is balanced at 10/10
    let m = SectorMatrix::from_rows(
        labels(&["A", "B", "Totalj"]),
        labels(&["A", "B", "Totali"]),
        vec![
            vec![10.0, 0.0, 10.0],
            vec![0.0, 10.0, 10.0],
            vec![15.0, 10.0, 25.0],
        ],
    )
    .unwrap();
    let b = FlowBalancer::new(
        m,
        labels(&["A", "B"]),
        CorrectionTable::new(),
        BalancerConfig::default(),
    )
    .unwrap();

    let mut working = b.matrix().clone();
    let before = b.equilibrium(&working).unwrap();
    assert_eq!(before.get("A"), Some(-5.0));
    assert_eq!(before.get("B"), Some(0.0));

    b.relax_pass(&mut working).unwrap();

    assert_eq!(working.row_values("A").unwrap(), vec![15.0, 0.0, 15.0]);
    assert_eq!(working.row_values("B").unwrap(), vec![0.0, 10.0, 10.0]);
}

#[test]
fn test_positive_imbalance_scales_column() {
    let b = balancer(
        &["A", "B"],
        vec![vec![6.0, 4.0], vec![2.0, 8.0]],
        BalancerConfig::default(),
    );
    let mut working = b.fixed_matrix("2020").unwrap();
    assert_eq!(b.equilibrium(&working).unwrap().get("A"), Some(2.0));

    b.relax_pass(&mut working).unwrap();
    // column A × 10/8 first, then B's row sees the updated totals
    assert_eq!(working.value("A", "A"), Some(7.5));
    assert_eq!(working.value("B", "A").map(|v| (v * 1e9).round() / 1e9), Some(2.857142857));
}

// ============================================================================
// Full Loop
// ============================================================================

#[test]
fn test_balanced_input_needs_no_passes() {
    let b = balancer(
        &["A", "B"],
        vec![vec![5.0, 5.0], vec![5.0, 5.0]],
        BalancerConfig::default(),
    );
    let outcome = b.balance("2020").unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.residual, 0.0);
    // normalized by the first row's total purchase (10)
    assert_eq!(outcome.matrix.value("A", "A"), Some(0.5));
    assert_eq!(outcome.matrix.value("A", "Totali"), Some(1.0));
}

#[test]
fn test_unbalanced_input_converges() {
    let b = balancer(
        &["A", "B"],
        vec![vec![6.0, 4.0], vec![2.0, 8.0]],
        BalancerConfig::default(),
    );
    let outcome = b.balance("2020").unwrap();

    assert!(outcome.converged);
    assert!(outcome.iterations > 1);
    assert!(outcome.residual < 1e-6);
    assert!((outcome.matrix.value("A", "Totali").unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_iteration_cap_reports_non_convergence() {
    let config = BalancerConfig {
        max_iterations: 1,
        ..Default::default()
    };
    let b = balancer(&["A", "B"], vec![vec![6.0, 4.0], vec![2.0, 8.0]], config);
    let outcome = b.balance("2020").unwrap();

    assert!(!outcome.converged);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.residual > 1e-6);
}

#[test]
fn test_zero_first_row_skips_normalization() {
    let b = balancer(
        &["A", "B"],
        vec![vec![0.0, 0.0], vec![0.0, 3.0]],
        BalancerConfig::default(),
    );
    let outcome = b.balance("2020").unwrap();
    assert_eq!(outcome.matrix.value("B", "B"), Some(3.0));
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_balanced_implies_threshold(
        cells in prop::collection::vec(0.1f64..100.0, 9),
        passes in 0usize..6,
    ) {
        let body: Vec<Vec<f64>> = cells.chunks(3).map(|c| c.to_vec()).collect();
        let b = balancer(&["A", "B", "C"], body, BalancerConfig::default());

        let mut working = b.fixed_matrix("2020").unwrap();
        for _ in 0..passes {
            b.relax_pass(&mut working).unwrap();
        }
        if b.check_if_balanced(&working).unwrap() {
            prop_assert!(b.equilibrium(&working).unwrap().abs_sum() < b.config().target_threshold);
        }
    }

    #[test]
    fn prop_outcome_flag_matches_residual(
        cells in prop::collection::vec(0.1f64..100.0, 4),
        max_iterations in 1usize..20,
    ) {
        let body: Vec<Vec<f64>> = cells.chunks(2).map(|c| c.to_vec()).collect();
        let config = BalancerConfig { max_iterations, ..Default::default() };
        let outcome = balancer(&["A", "B"], body, config).balance("2020").unwrap();

        prop_assert!(outcome.iterations <= max_iterations);
        prop_assert_eq!(outcome.converged, outcome.residual < 1e-6);
    }
}
