//! Provisioning seam for ephemeral database instances.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::HarnessError;

/// Condition an instance must meet before it counts as ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessCheck {
    /// The exposed port accepts TCP connections
    PortListening,
    /// The container logged this line
    LogMessage(String),
}

/// Everything a provider needs to start one instance.
#[derive(Debug, Clone)]
pub struct InstanceRequest {
    /// Image reference, `name[:tag]`
    pub image: String,
    /// Container port to publish
    pub exposed_port: u16,
    /// Container environment
    pub env: BTreeMap<String, String>,
    /// All checks must pass before `provision` returns
    pub readiness: Vec<ReadinessCheck>,
    pub readiness_timeout: Duration,
}

/// Starts ephemeral instances.
#[allow(async_fn_in_trait)]
pub trait InstanceProvider {
    type Instance: EphemeralInstance;

    /// Starts an instance and blocks until every readiness check passes.
    async fn provision(&self, request: &InstanceRequest) -> Result<Self::Instance, HarnessError>;
}

/// A running instance owned by the caller.
#[allow(async_fn_in_trait)]
pub trait EphemeralInstance: Sized {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Host the instance is reachable on from the test process.
    async fn host(&self) -> Result<String, HarnessError>;

    /// Host port published for `container_port`.
    async fn mapped_port(&self, container_port: u16) -> Result<u16, HarnessError>;

    /// Stops and removes the instance.
    async fn terminate(self) -> Result<(), HarnessError>;
}

/// Scoped owner of an instance.
///
/// [`InstanceGuard::release`] terminates the instance exactly once. A guard
/// dropped without release (panic, cancelled future) drops the instance and
/// leaves reaping to the backend's own `Drop`.
#[derive(Debug)]
pub struct InstanceGuard<I: EphemeralInstance> {
    instance: Option<I>,
}

impl<I: EphemeralInstance> InstanceGuard<I> {
    pub fn new(instance: I) -> Self {
        Self {
            instance: Some(instance),
        }
    }

    /// Returns the guarded instance.
    pub fn instance(&self) -> &I {
        // Only `release` and `drop` take the instance, and both consume the guard.
        self.instance
            .as_ref()
            .expect("instance is present until the guard is released")
    }

    /// Terminates the instance.
    pub async fn release(mut self) -> Result<(), HarnessError> {
        match self.instance.take() {
            Some(instance) => {
                let id = instance.id().to_string();
                tracing::debug!(instance = %id, "Terminating instance");
                instance.terminate().await?;
                tracing::info!(instance = %id, "Instance terminated");
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl<I: EphemeralInstance> Drop for InstanceGuard<I> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            tracing::warn!(
                instance = %instance.id(),
                "Instance guard dropped without release"
            );
        }
    }
}
