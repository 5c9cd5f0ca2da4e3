//! Circuit model
//!
//! A circuit is a closed economic transaction loop: a set of launches that
//! must balance. Circuits are grouped into a [`CircuitTable`], whose
//! flattened launches feed the matrix builder.
//!
//! # Critical Invariants
//!
//! 1. **Launch uniqueness**: a launch id appears at most once per circuit
//! 2. **Explicit removal**: removing an unknown launch or circuit is an error

use crate::models::record::{Field, TransactionRecord};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Errors raised by circuit bookkeeping
#[derive(Debug, Error, PartialEq)]
pub enum CircuitError {
    #[error("Launch with ID {launch_id} does not exist in circuit {circuit_id}")]
    LaunchNotFound {
        circuit_id: String,
        launch_id: String,
    },

    #[error("Circuit with ID {0} does not exist in table")]
    CircuitNotFound(String),
}

/// A group of launches forming one transaction loop
#[derive(Debug, Clone)]
pub struct Circuit {
    id: String,
    launches: BTreeMap<String, TransactionRecord>,
    closed: bool,

    /// Mean launch quantity, computed when the circuit closes
    mean_quantity: Option<f64>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create an open circuit with a fresh UUID
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            launches: BTreeMap::new(),
            closed: false,
            mean_quantity: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a launch; an existing launch with the same id is replaced and returned
    pub fn add_launch(
        &mut self,
        launch_id: impl Into<String>,
        record: TransactionRecord,
    ) -> Option<TransactionRecord> {
        self.launches.insert(launch_id.into(), record)
    }

    pub fn remove_launch(&mut self, launch_id: &str) -> Result<TransactionRecord, CircuitError> {
        self.launches
            .remove(launch_id)
            .ok_or_else(|| CircuitError::LaunchNotFound {
                circuit_id: self.id.clone(),
                launch_id: launch_id.to_string(),
            })
    }

    pub fn launches(&self) -> &BTreeMap<String, TransactionRecord> {
        &self.launches
    }

    pub fn num_launches(&self) -> usize {
        self.launches.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Close the circuit and compute its mean launch quantity
    pub fn close(&mut self) {
        let quantities: Vec<f64> = self
            .launches
            .values()
            .filter_map(|r| r.number(Field::Quantity))
            .collect();
        self.mean_quantity = if quantities.is_empty() {
            None
        } else {
            Some(quantities.iter().sum::<f64>() / quantities.len() as f64)
        };
        self.closed = true;
        debug!(circuit = %self.id, launches = self.launches.len(), "circuit closed");
    }

    pub fn mean_quantity(&self) -> Option<f64> {
        self.mean_quantity
    }
}

/// Collection of circuits
#[derive(Debug, Clone, Default)]
pub struct CircuitTable {
    circuits: BTreeMap<String, Circuit>,
}

impl CircuitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a circuit, replacing any circuit with the same id
    pub fn insert(&mut self, circuit: Circuit) {
        self.circuits.insert(circuit.id().to_string(), circuit);
    }

    pub fn remove(&mut self, circuit_id: &str) -> Result<Circuit, CircuitError> {
        self.circuits
            .remove(circuit_id)
            .ok_or_else(|| CircuitError::CircuitNotFound(circuit_id.to_string()))
    }

    pub fn get(&self, circuit_id: &str) -> Option<&Circuit> {
        self.circuits.get(circuit_id)
    }

    pub fn get_mut(&mut self, circuit_id: &str) -> Option<&mut Circuit> {
        self.circuits.get_mut(circuit_id)
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }

    /// Close every open circuit
    pub fn close_all(&mut self) {
        for circuit in self.circuits.values_mut().filter(|c| !c.is_closed()) {
            circuit.close();
        }
    }

    /// All launches of all circuits, ordered by circuit id then launch id
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.circuits
            .values()
            .flat_map(|c| c.launches().values().cloned())
            .collect()
    }
}
