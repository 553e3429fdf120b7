//! Single-connection PostgreSQL client on `sqlx`.

use std::time::Duration;

use ephemeral_db_core::{Connector, DatabaseClient, HarnessError, Record};
use sqlx::{Connection, PgConnection};

/// Opens one unpooled connection per call.
#[derive(Debug, Clone)]
pub struct PgConnector {
    connect_timeout: Duration,
}

impl PgConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Connector for PgConnector {
    type Client = PgClient;

    async fn connect(&self, url: &str) -> Result<PgClient, HarnessError> {
        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect(url))
            .await
            .map_err(|_| {
                HarnessError::Connect(format!(
                    "timed out after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| HarnessError::Connect(e.to_string()))?;
        Ok(PgClient { conn })
    }
}

/// An open connection.
pub struct PgClient {
    conn: PgConnection,
}

impl PgClient {
    /// Raw connection for statements outside the scenario.
    pub fn connection_mut(&mut self) -> &mut PgConnection {
        &mut self.conn
    }
}

impl DatabaseClient for PgClient {
    async fn execute(
        &mut self,
        step: &'static str,
        sql: &str,
        params: &[&str],
    ) -> Result<u64, HarnessError> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        let result = query
            .execute(&mut self.conn)
            .await
            .map_err(|e| HarnessError::sql(step, e))?;
        Ok(result.rows_affected())
    }

    async fn query_records(
        &mut self,
        step: &'static str,
        sql: &str,
        params: &[&str],
    ) -> Result<Vec<Record>, HarnessError> {
        let mut query = sqlx::query_as::<_, (i32, String)>(sql);
        for param in params {
            query = query.bind(*param);
        }
        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| HarnessError::sql(step, e))?;
        rows.into_iter()
            .map(|(id, name)| Record::new(id, name))
            .collect()
    }

    async fn close(self) -> Result<(), HarnessError> {
        self.conn
            .close()
            .await
            .map_err(|e| HarnessError::Connect(format!("close: {e}")))
    }
}
