use super::ReadinessChecker;
use crate::config::{Settings, DEFAULT_ATTEMPT_TIMEOUT};
use crate::container::ContainerView;
use crate::context::Context;
use crate::docker::{DockerClient, DockerError};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Ready once a shell command run inside the container exits 0,
/// e.g. `pg_isready -U postgres`.
#[derive(Debug, Clone)]
pub struct ExecChecker {
    command: String,
    timeout: Duration,
    client: DockerClient,
}

impl ExecChecker {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            client: DockerClient::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound each attempt by `settings.attempt_timeout`.
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_timeout(settings.attempt_timeout)
    }

    pub fn with_client(mut self, client: DockerClient) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl ReadinessChecker for ExecChecker {
    async fn check(&self, _ctx: &Context, container: &ContainerView) -> Result<bool> {
        let resource = container
            .resource()
            .ok_or_else(|| Error::NotStarted(container.name().to_string()))?;

        match self
            .client
            .exec_sh(&resource.id, &self.command, self.timeout)
            .await
        {
            Ok(output) => Ok(output.status.success()),
            // The CLI itself is missing; polling again won't help
            Err(e @ DockerError::ExecFailed { .. }) => {
                Err(Error::readiness(container.name(), e))
            }
            Err(e) => {
                tracing::trace!("'{}': exec check failed: {}", container.name(), e);
                Ok(false)
            }
        }
    }
}
