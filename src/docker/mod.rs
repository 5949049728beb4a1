//! Container engine collaborator.
//!
//! The orchestration core only talks to the [`Engine`] trait. [`DockerEngine`]
//! is the production implementation, driving the `docker` CLI through
//! [`DockerClient`]; tests substitute an in-memory engine.

pub mod client;
pub mod error;

pub use client::{DockerClient, NetworkInfo};
pub use error::DockerError;

use crate::address::normalize_port;
use crate::config::Settings;
use crate::container::ServiceSpec;
use async_trait::async_trait;
use std::collections::HashMap;

/// A launched container instance, as handed back by [`Engine::launch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub name: String,
    /// Gateway address of the network the container is attached to.
    pub gateway: String,
    /// Container port (`"27017/tcp"`) to published host port (`"49153"`).
    pub ports: HashMap<String, String>,
}

impl Resource {
    /// Host port published for a declared container port.
    ///
    /// Accepts both `"27017"` and `"27017/tcp"`.
    pub fn mapped_port(&self, port: &str) -> Option<&str> {
        self.ports.get(&normalize_port(port)).map(String::as_str)
    }
}

/// Operations the harness needs from a container engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Remove any instance left under `name`. Absent instances are not an error.
    async fn purge(&self, name: &str) -> Result<(), DockerError>;

    /// Start a fresh instance matching `spec`.
    async fn launch(&self, spec: &ServiceSpec) -> Result<Resource, DockerError>;

    /// Release a previously launched instance.
    async fn close(&self, resource: &Resource) -> Result<(), DockerError>;
}

/// [`Engine`] backed by the Docker CLI.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    client: DockerClient,
    settings: Settings,
}

impl DockerEngine {
    /// Create an engine without contacting the daemon.
    pub fn new(settings: Settings) -> Self {
        Self {
            client: DockerClient::new(),
            settings,
        }
    }

    /// Create an engine after verifying the daemon responds.
    pub async fn connect(settings: Settings) -> Result<Self, DockerError> {
        let engine = Self::new(settings);
        if !engine
            .client
            .daemon_healthy(engine.settings.command_timeout)
            .await
        {
            return Err(DockerError::DaemonUnavailable);
        }
        tracing::debug!("Docker daemon is reachable");
        Ok(engine)
    }

    pub fn client(&self) -> &DockerClient {
        &self.client
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Remove every container carrying the harness label, e.g. left-overs
    /// from a test run that crashed before teardown. Returns how many were removed.
    pub async fn cleanup_managed(&self) -> Result<usize, DockerError> {
        let names = self
            .client
            .ps_names(&self.settings.label_filter(), self.settings.command_timeout)
            .await?;
        for name in &names {
            tracing::info!("Removing left-over container '{}'", name);
            self.client
                .rm_force(name, self.settings.command_timeout)
                .await?;
        }
        Ok(names.len())
    }
}

/// Arguments following `docker run -d` for a service.
pub(crate) fn run_args(spec: &ServiceSpec, label: &str) -> Vec<String> {
    let mut args = vec![
        "--name".to_string(),
        spec.name.clone(),
        "--label".to_string(),
        label.to_string(),
    ];

    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }

    if spec.ports.is_empty() {
        // Publish whatever the image EXPOSEs.
        args.push("-P".to_string());
    } else {
        for port in &spec.ports {
            args.push("-p".to_string());
            args.push(normalize_port(port));
        }
    }

    args.push(spec.image_ref());
    args.extend(spec.cmd.iter().cloned());
    args
}

#[async_trait]
impl Engine for DockerEngine {
    async fn purge(&self, name: &str) -> Result<(), DockerError> {
        self.client
            .rm_force(name, self.settings.command_timeout)
            .await
    }

    async fn launch(&self, spec: &ServiceSpec) -> Result<Resource, DockerError> {
        let args = run_args(spec, &self.settings.label);
        tracing::info!("Launching '{}' from {}", spec.name, spec.image_ref());

        let id = self
            .client
            .run_detached(&args, self.settings.launch_timeout)
            .await?;

        let network = match self
            .client
            .inspect_network(&id, self.settings.command_timeout)
            .await
        {
            Ok(network) => network,
            Err(e) => {
                // Don't leak a container the caller never got a handle to
                if let Err(rm_err) = self.client.rm_force(&id, self.settings.command_timeout).await {
                    tracing::warn!("Failed to remove container {} after inspect error: {}", id, rm_err);
                }
                return Err(e);
            }
        };

        tracing::debug!(
            "'{}' is container {} (gateway {}, ports {:?})",
            spec.name,
            id,
            network.gateway,
            network.ports
        );

        Ok(Resource {
            id,
            name: spec.name.clone(),
            gateway: network.gateway,
            ports: network.ports,
        })
    }

    async fn close(&self, resource: &Resource) -> Result<(), DockerError> {
        tracing::info!("Removing container {} ('{}')", resource.id, resource.name);
        self.client
            .rm_force(&resource.id, self.settings.command_timeout)
            .await
    }
}
