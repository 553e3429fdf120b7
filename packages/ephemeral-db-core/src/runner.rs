//! The end-to-end CRUD scenario.

use std::time::Instant;

use serde::Serialize;

use crate::client::{Connector, DatabaseClient};
use crate::config::ScenarioConfig;
use crate::error::HarnessError;
use crate::provider::{EphemeralInstance, InstanceGuard, InstanceProvider};
use crate::record::Record;
use crate::statements::{self, step};

/// Outcome of a successful scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Instance the scenario ran against
    pub instance_id: String,
    /// Connection string with the password masked
    pub endpoint: String,
    /// Row read back after the insert
    pub record: Record,
    /// Rows removed by the delete step
    pub deleted_rows: u64,
    /// Rows matching the delete name afterwards (always zero on success)
    pub remaining_rows: usize,
    /// Wall time from provisioning to teardown
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, HarnessError> {
        serde_json::to_string_pretty(self).map_err(|e| HarnessError::Serialization(e.to_string()))
    }
}

/// Data gathered by the SQL steps.
struct CrudOutcome {
    record: Record,
    deleted_rows: u64,
    remaining_rows: usize,
}

/// Runs the provision, CRUD, teardown scenario once per [`run`](Self::run).
#[derive(Debug)]
pub struct IntegrationTestRunner<P, C> {
    config: ScenarioConfig,
    provider: P,
    connector: C,
}

impl<P, C> IntegrationTestRunner<P, C>
where
    P: InstanceProvider,
    C: Connector,
{
    pub fn new(config: ScenarioConfig, provider: P, connector: C) -> Self {
        Self {
            config,
            provider,
            connector,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Runs the scenario.
    ///
    /// The instance is terminated exactly once whenever provisioning
    /// succeeded. If both the scenario and teardown fail, the scenario error
    /// is returned and the teardown error is logged.
    pub async fn run(&self) -> Result<ScenarioReport, HarnessError> {
        self.config.validate()?;
        let started = Instant::now();

        let request = self.config.instance_request();
        tracing::info!(image = %request.image, port = request.exposed_port, "Provisioning instance");
        let instance = self.provider.provision(&request).await?;
        tracing::info!(instance = %instance.id(), "Instance ready");

        let guard = InstanceGuard::new(instance);
        let outcome = self.exercise(guard.instance()).await;
        let teardown = guard.release().await;

        match (outcome, teardown) {
            (Ok(mut report), Ok(())) => {
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::info!(
                    elapsed_ms = report.elapsed_ms,
                    "Database operations completed successfully"
                );
                Ok(report)
            }
            (Ok(_), Err(teardown_err)) => {
                tracing::error!("Scenario passed but teardown failed: {}", teardown_err);
                Err(teardown_err)
            }
            (Err(err), Ok(())) => {
                log_failure(&err);
                Err(err)
            }
            (Err(err), Err(teardown_err)) => {
                log_failure(&err);
                tracing::error!("Teardown also failed: {}", teardown_err);
                Err(err)
            }
        }
    }

    /// Connects to the instance and runs the SQL steps.
    async fn exercise(&self, instance: &P::Instance) -> Result<ScenarioReport, HarnessError> {
        let host = instance.host().await?;
        let port = instance.mapped_port(self.config.port).await?;
        let endpoint = self.config.redacted_url(&host, port);
        tracing::info!(endpoint = %endpoint, "Connecting");

        let mut client = self
            .connector
            .connect(&self.config.connection_url(&host, port))
            .await?;
        let outcome = self.crud(&mut client).await;
        let closed = client.close().await;

        let outcome = match (outcome, closed) {
            (Ok(outcome), Ok(())) => outcome,
            (Ok(_), Err(close_err)) => return Err(close_err),
            (Err(err), Ok(())) => return Err(err),
            (Err(err), Err(close_err)) => {
                tracing::warn!("Failed to close connection: {}", close_err);
                return Err(err);
            }
        };

        Ok(ScenarioReport {
            instance_id: instance.id().to_string(),
            endpoint,
            record: outcome.record,
            deleted_rows: outcome.deleted_rows,
            remaining_rows: outcome.remaining_rows,
            elapsed_ms: 0,
        })
    }

    async fn crud(&self, client: &mut C::Client) -> Result<CrudOutcome, HarnessError> {
        let table = self.config.table.as_str();
        let insert_name = self.config.insert_name.as_str();
        let delete_name = self.config.delete_name.as_str();

        let sql = statements::create_table(table);
        tracing::debug!(sql = %sql, "Executing");
        client.execute(step::CREATE_TABLE, &sql, &[]).await?;
        tracing::info!(table, "Table created");

        let sql = statements::insert(table);
        tracing::debug!(sql = %sql, name = insert_name, "Executing");
        client.execute(step::INSERT, &sql, &[insert_name]).await?;
        tracing::info!(table, name = insert_name, "Record inserted");

        let sql = statements::select_by_name(table);
        let rows = client.query_records(step::SELECT, &sql, &[insert_name]).await?;
        let record = expect_single(step::SELECT, rows, insert_name)?;
        tracing::info!(id = record.id, name = %record.name, "Record read back");

        let sql = statements::delete_by_name(table);
        tracing::debug!(sql = %sql, name = delete_name, "Executing");
        let deleted_rows = client.execute(step::DELETE, &sql, &[delete_name]).await?;

        let sql = statements::select_by_name(table);
        let remaining = client
            .query_records(step::VERIFY_DELETE, &sql, &[delete_name])
            .await?;
        if !remaining.is_empty() {
            return Err(HarnessError::Assertion {
                step: step::VERIFY_DELETE,
                expected: "no rows".to_string(),
                actual: format!("{} row(s)", remaining.len()),
            });
        }
        tracing::info!(name = delete_name, deleted_rows, "Record deletion verified");

        Ok(CrudOutcome {
            record,
            deleted_rows,
            remaining_rows: remaining.len(),
        })
    }
}

/// Checks that `rows` holds exactly one record named `expected`.
fn expect_single(
    step: &'static str,
    mut rows: Vec<Record>,
    expected: &str,
) -> Result<Record, HarnessError> {
    if rows.len() != 1 {
        return Err(HarnessError::Assertion {
            step,
            expected: format!("1 row named '{expected}'"),
            actual: format!("{} row(s)", rows.len()),
        });
    }
    let record = rows.remove(0);
    if record.name != expected {
        return Err(HarnessError::Assertion {
            step,
            expected: format!("'{expected}'"),
            actual: format!("'{}'", record.name),
        });
    }
    Ok(record)
}

fn log_failure(err: &HarnessError) {
    if err.is_assertion() {
        tracing::error!("Scenario assertion failed: {}", err);
    } else {
        tracing::error!("Scenario aborted: {}", err);
    }
}
