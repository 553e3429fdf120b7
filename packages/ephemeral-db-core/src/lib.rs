//! Ephemeral database CRUD scenario runner.
//!
//! Provisions a disposable database instance through an [`InstanceProvider`],
//! runs a fixed create/insert/select/delete scenario through a
//! [`DatabaseClient`], and tears the instance down on every exit path.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
pub mod record;
pub mod runner;
pub mod statements;

pub use client::{Connector, DatabaseClient};
pub use config::{ImageRef, ScenarioConfig};
pub use error::HarnessError;
pub use provider::{
    EphemeralInstance, InstanceGuard, InstanceProvider, InstanceRequest, ReadinessCheck,
};
pub use record::Record;
pub use runner::{IntegrationTestRunner, ScenarioReport};
