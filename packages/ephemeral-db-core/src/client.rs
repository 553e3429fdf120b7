//! Database client seam.

use crate::error::HarnessError;
use crate::record::Record;

/// Opens connections from a connection string.
#[allow(async_fn_in_trait)]
pub trait Connector {
    type Client: DatabaseClient;

    async fn connect(&self, url: &str) -> Result<Self::Client, HarnessError>;
}

/// A single open connection.
///
/// Parameters bind positionally to `$1`, `$2`, ... in `sql`. `step` names
/// the scenario step for error reporting.
#[allow(async_fn_in_trait)]
pub trait DatabaseClient: Sized {
    /// Runs a statement and returns the number of rows affected.
    async fn execute(
        &mut self,
        step: &'static str,
        sql: &str,
        params: &[&str],
    ) -> Result<u64, HarnessError>;

    /// Runs a query returning `(id, name)` rows.
    async fn query_records(
        &mut self,
        step: &'static str,
        sql: &str,
        params: &[&str],
    ) -> Result<Vec<Record>, HarnessError>;

    /// Closes the connection.
    async fn close(self) -> Result<(), HarnessError>;
}
