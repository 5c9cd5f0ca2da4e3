//! Domain models for launches and circuits

pub mod circuit;
pub mod record;

// Re-exports
pub use circuit::{Circuit, CircuitError, CircuitTable};
pub use record::{Field, FieldValue, RecordDraft, RecordError, TransactionRecord};
