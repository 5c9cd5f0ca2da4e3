//! Record and Circuit Tests
//!
//! Write-once entry, validation, and circuit bookkeeping.

use regional_io_core_rs::{
    Circuit, CircuitError, CircuitTable, Field, FieldValue, RecordDraft, RecordError,
    TransactionRecord,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn launch(seller: &str, buyer: &str, quantity: f64, value: f64) -> TransactionRecord {
    let mut draft = RecordDraft::new();
    draft.set_if_absent(Field::SellerSectorI, seller);
    draft.set_if_absent(Field::BuyerSectorI, buyer);
    draft.set_if_absent(Field::Product, "Acai");
    draft.set_if_absent(Field::Quantity, quantity);
    draft.set_if_absent(Field::Value, value);
    draft.validate().unwrap()
}

// ============================================================================
// Draft / Validation
// ============================================================================

#[test]
fn test_empty_string_counts_as_set() {
    let mut draft = RecordDraft::new();
    assert!(draft.set_if_absent(Field::Unit, ""));
    assert!(!draft.set_if_absent(Field::Unit, "kg"));
    assert_eq!(draft.get(Field::Unit), Some(&FieldValue::Text(String::new())));
}

#[test]
fn test_input_by_name() {
    let mut draft = RecordDraft::new();
    assert_eq!(draft.input("Quantity", 12.0), Ok(true));
    assert_eq!(draft.input("Quantity", 13.0), Ok(false));
    assert_eq!(draft.get(Field::Quantity), Some(&FieldValue::Number(12.0)));
}

#[test]
fn test_check_data_lists_every_field() {
    let mut draft = RecordDraft::new();
    draft.set_if_absent(Field::Product, "Acai");

    let data = draft.check_data();
    assert_eq!(data.len(), Field::ALL.len());
    let present: Vec<Field> = data
        .iter()
        .filter(|(_, v)| v.is_some())
        .map(|(f, _)| *f)
        .collect();
    assert_eq!(present, vec![Field::Product]);
}

#[test]
fn test_validate_requires_core_fields() {
    let mut draft = RecordDraft::new();
    draft.set_if_absent(Field::SellerSectorI, "Farm");
    draft.set_if_absent(Field::BuyerSectorI, "Mill");
    draft.set_if_absent(Field::Product, "Acai");
    draft.set_if_absent(Field::Quantity, 1.0);

    assert_eq!(
        draft.validate().unwrap_err(),
        RecordError::MissingField(Field::Value)
    );
}

#[test]
fn test_validate_rejects_text_quantity() {
    let mut draft = RecordDraft::new();
    draft.set_if_absent(Field::SellerSectorI, "Farm");
    draft.set_if_absent(Field::BuyerSectorI, "Mill");
    draft.set_if_absent(Field::Product, "Acai");
    draft.set_if_absent(Field::Quantity, "ten");
    draft.set_if_absent(Field::Value, 1.0);

    assert_eq!(
        draft.validate().unwrap_err(),
        RecordError::WrongKind {
            field: Field::Quantity,
            expected: "numeric"
        }
    );
}

#[test]
fn test_record_serializes_with_field_names() {
    let record = launch("Farm", "Mill", 2.0, 8.0);
    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"SellerSectorI\":\"Farm\""));

    let back: TransactionRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

// ============================================================================
// Circuits
// ============================================================================

#[test]
fn test_circuit_ids_are_unique() {
    assert_ne!(Circuit::new().id(), Circuit::new().id());
}

#[test]
fn test_remove_missing_launch_is_error() {
    let mut circuit = Circuit::with_id("C1");
    circuit.add_launch("L1", launch("Farm", "Mill", 1.0, 1.0));

    assert!(circuit.remove_launch("L1").is_ok());
    assert_eq!(
        circuit.remove_launch("L1").unwrap_err(),
        CircuitError::LaunchNotFound {
            circuit_id: "C1".to_string(),
            launch_id: "L1".to_string()
        }
    );
}

#[test]
fn test_close_computes_mean_quantity() {
    let mut circuit = Circuit::with_id("C1");
    circuit.add_launch("L1", launch("Farm", "Mill", 10.0, 1.0));
    circuit.add_launch("L2", launch("Mill", "Shop", 20.0, 1.0));

    assert!(!circuit.is_closed());
    circuit.close();
    assert!(circuit.is_closed());
    assert_eq!(circuit.mean_quantity(), Some(15.0));
}

#[test]
fn test_table_flattens_launches() {
    let mut first = Circuit::with_id("A");
    first.add_launch("1", launch("Farm", "Mill", 1.0, 1.0));
    first.add_launch("2", launch("Mill", "Shop", 2.0, 1.0));
    let mut second = Circuit::with_id("B");
    second.add_launch("1", launch("Shop", "Home", 3.0, 1.0));

    let mut table = CircuitTable::new();
    table.insert(first);
    table.insert(second);
    table.close_all();

    let quantities: Vec<f64> = table
        .records()
        .iter()
        .map(|r| r.number(Field::Quantity).unwrap())
        .collect();
    assert_eq!(quantities, vec![1.0, 2.0, 3.0]);
    assert!(table.get("A").unwrap().is_closed());

    assert_eq!(
        table.remove("Z").unwrap_err(),
        CircuitError::CircuitNotFound("Z".to_string())
    );
    assert_eq!(table.len(), 2);
}
