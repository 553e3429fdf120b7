//! Harness error types.

use thiserror::Error;

/// Errors raised while running a scenario.
///
/// Everything except [`HarnessError::Assertion`] is an infrastructure
/// failure: the scenario could not be carried out at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Invalid scenario configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Container could not be created or started
    #[error("Failed to provision '{image}': {reason}")]
    Provision { image: String, reason: String },

    /// Instance never became ready
    #[error("Instance port {port} not ready after {timeout_ms}ms")]
    Readiness { port: u16, timeout_ms: u64 },

    /// Host or mapped port could not be resolved
    #[error("Failed to resolve endpoint: {0}")]
    Endpoint(String),

    /// Connection could not be opened
    #[error("Failed to connect: {0}")]
    Connect(String),

    /// Statement or query failed
    #[error("SQL error during {step}: {reason}")]
    Sql { step: &'static str, reason: String },

    /// Instance could not be terminated
    #[error("Teardown failed: {0}")]
    Teardown(String),

    /// Returned data did not match the expectation
    #[error("Assertion failed during {step}: expected {expected}, got {actual}")]
    Assertion {
        step: &'static str,
        expected: String,
        actual: String,
    },

    /// Report could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record violates its invariants, e.g. an empty name read back
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl HarnessError {
    /// Builds an [`HarnessError::Sql`] for the given step.
    pub fn sql(step: &'static str, reason: impl ToString) -> Self {
        HarnessError::Sql {
            step,
            reason: reason.to_string(),
        }
    }

    /// Returns true if the data came back wrong.
    pub fn is_assertion(&self) -> bool {
        matches!(self, HarnessError::Assertion { .. })
    }

    /// Returns true if the scenario could not be carried out.
    ///
    /// Every error that is not an assertion failure is fatal.
    pub fn is_infrastructure(&self) -> bool {
        !self.is_assertion()
    }
}
