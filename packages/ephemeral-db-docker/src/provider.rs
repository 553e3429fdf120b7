//! Container provisioning through `testcontainers`.

use ephemeral_db_core::{
    EphemeralInstance, HarnessError, ImageRef, InstanceProvider, InstanceRequest, ReadinessCheck,
};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tokio::time::Instant;

use crate::readiness::wait_for_port;

/// Starts containers on the local Docker daemon.
#[derive(Debug, Clone, Default)]
pub struct DockerProvider;

impl DockerProvider {
    pub fn new() -> Self {
        Self
    }
}

impl InstanceProvider for DockerProvider {
    type Instance = DockerInstance;

    async fn provision(&self, request: &InstanceRequest) -> Result<DockerInstance, HarnessError> {
        let image_ref = ImageRef::parse(&request.image)?;
        let mut image = GenericImage::new(&image_ref.name, &image_ref.tag)
            .with_exposed_port(request.exposed_port.tcp());
        for check in &request.readiness {
            if let ReadinessCheck::LogMessage(line) = check {
                // PostgreSQL's init server logs to stdout, the final server to stderr.
                image = image
                    .with_wait_for(WaitFor::message_on_stdout(line.as_str()))
                    .with_wait_for(WaitFor::message_on_stderr(line.as_str()));
            }
        }
        let container_request = request.env.iter().fold(
            image.with_startup_timeout(request.readiness_timeout),
            |req, (key, value)| req.with_env_var(key, value),
        );

        // Container start and the port probe share one allowance.
        let deadline = Instant::now() + request.readiness_timeout;
        tracing::debug!(image = %image_ref, "Starting container");
        let container = container_request
            .start()
            .await
            .map_err(|e| HarnessError::Provision {
                image: image_ref.to_string(),
                reason: e.to_string(),
            })?;
        let instance = DockerInstance {
            id: container.id().to_string(),
            container,
        };

        if request.readiness.contains(&ReadinessCheck::PortListening) {
            let host = instance.host().await?;
            let port = instance.mapped_port(request.exposed_port).await?;
            wait_for_port(
                &host,
                port,
                request.exposed_port,
                deadline,
                request.readiness_timeout,
            )
            .await?;
        }
        Ok(instance)
    }
}

/// A running container.
///
/// Dropping it without [`EphemeralInstance::terminate`] still removes the
/// container through `ContainerAsync`'s own drop.
pub struct DockerInstance {
    id: String,
    container: ContainerAsync<GenericImage>,
}

impl std::fmt::Debug for DockerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerInstance").field("id", &self.id).finish()
    }
}

impl EphemeralInstance for DockerInstance {
    fn id(&self) -> &str {
        &self.id
    }

    async fn host(&self) -> Result<String, HarnessError> {
        self.container
            .get_host()
            .await
            .map(|host| host.to_string())
            .map_err(|e| HarnessError::Endpoint(e.to_string()))
    }

    async fn mapped_port(&self, container_port: u16) -> Result<u16, HarnessError> {
        self.container
            .get_host_port_ipv4(container_port.tcp())
            .await
            .map_err(|e| HarnessError::Endpoint(format!("port {container_port}: {e}")))
    }

    async fn terminate(self) -> Result<(), HarnessError> {
        self.container
            .rm()
            .await
            .map_err(|e| HarnessError::Teardown(format!("container {}: {}", self.id, e)))
    }
}
