//! Transaction record model
//!
//! A launch is a single transaction between a selling and a buying agent.
//! Its data is entered field by field into a [`RecordDraft`] and, once the
//! required fields are present, frozen into an immutable
//! [`TransactionRecord`] that the matrix builder consumes.
//!
//! # Write-once fields
//!
//! A draft field, once set, cannot be overwritten without an explicit
//! [`RecordDraft::remove`]. Presence is tracked explicitly, so a stored
//! `0.0` or empty string counts as set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while entering or validating record data
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Unknown field name: {0}")]
    UnknownField(String),

    #[error("Required field {0} is missing")]
    MissingField(Field),

    #[error("Field {field} must be {expected}")]
    WrongKind { field: Field, expected: &'static str },
}

/// Canonical launch schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    SellerName,
    SellerLocation,
    SellerType,
    SellerSectorI,
    SellerSectorII,
    SellerSectorIII,
    BuyerName,
    BuyerLocation,
    BuyerType,
    BuyerSectorI,
    BuyerSectorII,
    BuyerSectorIII,
    Product,
    Unit,
    Quantity,
    SurveyPrice,
    AgentPrice,
    AlphaSectorPrice,
    BasePrice,
    Value,
    SellerAgentCount,
    BuyerAgentCount,
    CircuitNumber,
    LaunchNumber,
    CircuitStatus,
    LaunchStatus,
}

impl Field {
    pub const ALL: [Field; 26] = [
        Field::SellerName,
        Field::SellerLocation,
        Field::SellerType,
        Field::SellerSectorI,
        Field::SellerSectorII,
        Field::SellerSectorIII,
        Field::BuyerName,
        Field::BuyerLocation,
        Field::BuyerType,
        Field::BuyerSectorI,
        Field::BuyerSectorII,
        Field::BuyerSectorIII,
        Field::Product,
        Field::Unit,
        Field::Quantity,
        Field::SurveyPrice,
        Field::AgentPrice,
        Field::AlphaSectorPrice,
        Field::BasePrice,
        Field::Value,
        Field::SellerAgentCount,
        Field::BuyerAgentCount,
        Field::CircuitNumber,
        Field::LaunchNumber,
        Field::CircuitStatus,
        Field::LaunchStatus,
    ];

    /// Fields every validated record must carry
    pub const REQUIRED: [Field; 5] = [
        Field::SellerSectorI,
        Field::BuyerSectorI,
        Field::Product,
        Field::Quantity,
        Field::Value,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::SellerName => "SellerName",
            Field::SellerLocation => "SellerLocation",
            Field::SellerType => "SellerType",
            Field::SellerSectorI => "SellerSectorI",
            Field::SellerSectorII => "SellerSectorII",
            Field::SellerSectorIII => "SellerSectorIII",
            Field::BuyerName => "BuyerName",
            Field::BuyerLocation => "BuyerLocation",
            Field::BuyerType => "BuyerType",
            Field::BuyerSectorI => "BuyerSectorI",
            Field::BuyerSectorII => "BuyerSectorII",
            Field::BuyerSectorIII => "BuyerSectorIII",
            Field::Product => "Product",
            Field::Unit => "Unit",
            Field::Quantity => "Quantity",
            Field::SurveyPrice => "SurveyPrice",
            Field::AgentPrice => "AgentPrice",
            Field::AlphaSectorPrice => "AlphaSectorPrice",
            Field::BasePrice => "BasePrice",
            Field::Value => "Value",
            Field::SellerAgentCount => "SellerAgentCount",
            Field::BuyerAgentCount => "BuyerAgentCount",
            Field::CircuitNumber => "CircuitNumber",
            Field::LaunchNumber => "LaunchNumber",
            Field::CircuitStatus => "CircuitStatus",
            Field::LaunchStatus => "LaunchStatus",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| RecordError::UnknownField(s.to_string()))
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Mutable entry form for one launch
///
/// # Example
///
/// ```rust
/// use regional_io_core_rs::models::record::{Field, RecordDraft};
///
/// let mut draft = RecordDraft::new();
/// assert!(draft.set_if_absent(Field::Quantity, 0.0));
/// assert!(!draft.set_if_absent(Field::Quantity, 5.0)); // write-once
///
/// draft.remove(Field::Quantity);
/// assert!(draft.set_if_absent(Field::Quantity, 5.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    values: BTreeMap<Field, FieldValue>,
}

impl RecordDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` unless the field is already set
    ///
    /// Returns `true` if the value was stored.
    pub fn set_if_absent(&mut self, field: Field, value: impl Into<FieldValue>) -> bool {
        if self.values.contains_key(&field) {
            return false;
        }
        self.values.insert(field, value.into());
        true
    }

    /// Store a value addressed by field name
    pub fn input(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<bool, RecordError> {
        let field = name.parse::<Field>()?;
        Ok(self.set_if_absent(field, value))
    }

    /// Clear a field so it can be set again
    pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
        self.values.remove(&field)
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Every schema field with its current value, if any
    pub fn check_data(&self) -> Vec<(Field, Option<&FieldValue>)> {
        Field::ALL
            .iter()
            .map(|field| (*field, self.values.get(field)))
            .collect()
    }

    /// Freeze into a record
    ///
    /// Sector and product fields must be text; quantity and value must be
    /// numeric.
    pub fn validate(self) -> Result<TransactionRecord, RecordError> {
        for field in Field::REQUIRED {
            let value = self.values.get(&field).ok_or(RecordError::MissingField(field))?;
            match field {
                Field::Quantity | Field::Value => {
                    if value.as_number().is_none() {
                        return Err(RecordError::WrongKind {
                            field,
                            expected: "numeric",
                        });
                    }
                }
                _ => {
                    if value.as_text().is_none() {
                        return Err(RecordError::WrongKind {
                            field,
                            expected: "text",
                        });
                    }
                }
            }
        }
        Ok(TransactionRecord {
            values: self.values,
        })
    }
}

/// Validated, immutable launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    values: BTreeMap<Field, FieldValue>,
}

impl TransactionRecord {
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn text(&self, field: Field) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn number(&self, field: Field) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&Field, &FieldValue)> {
        self.values.iter()
    }
}
