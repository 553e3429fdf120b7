//! The single row type the scenario writes and reads.

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// A row of the scenario table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier assigned by the database
    pub id: i32,
    /// Never empty
    pub name: String,
}

impl Record {
    /// Creates a record, rejecting an empty name.
    pub fn new(id: i32, name: impl Into<String>) -> Result<Self, HarnessError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { id, name })
    }
}

/// Checks the name invariant shared by inserts and reads.
fn validate_name(name: &str) -> Result<(), HarnessError> {
    if name.is_empty() {
        return Err(HarnessError::InvalidRecord(
            "name must not be empty".to_string(),
        ));
    }
    Ok(())
}
