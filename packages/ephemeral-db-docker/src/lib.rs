//! Docker-backed collaborators for `ephemeral-db-core`.
//!
//! [`DockerProvider`] starts PostgreSQL containers through `testcontainers`
//! and [`PgConnector`] talks to them over a single `sqlx` connection.

pub mod client;
pub mod provider;
pub mod readiness;

use ephemeral_db_core::{IntegrationTestRunner, ScenarioConfig};

pub use client::{PgClient, PgConnector};
pub use provider::{DockerInstance, DockerProvider};

/// Runner wired to Docker and PostgreSQL.
pub type PostgresRunner = IntegrationTestRunner<DockerProvider, PgConnector>;

/// Builds a runner for `config` using the local Docker daemon.
pub fn postgres_runner(config: ScenarioConfig) -> PostgresRunner {
    let connector = PgConnector::new(config.connect_timeout());
    IntegrationTestRunner::new(config, DockerProvider::new(), connector)
}
