//! Centralized Docker CLI client.
//!
//! All Docker CLI interactions go through `DockerClient`, which provides
//! consistent timeout handling, error mapping to [`DockerError`], and a single
//! point where `Command::new("docker")` is constructed.

use super::DockerError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::process::Output;
use std::time::Duration;

/// Network details of a running container, as reported by `docker inspect`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Gateway address of the container's network.
    pub gateway: String,
    /// Container port (e.g. "5432/tcp") to host port (e.g. "59890").
    pub ports: HashMap<String, String>,
}

/// Centralized client for Docker CLI operations.
#[derive(Debug, Clone)]
pub struct DockerClient {
    binary: String,
}

impl DockerClient {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a different CLI binary (e.g. `podman`, which accepts the same arguments).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        DockerClient {
            binary: binary.into(),
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn command_string(&self, args: &[&str]) -> String {
        format!("{} {}", self.binary, args.join(" "))
    }

    /// Run a docker command with a timeout, returning raw Output.
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<Output, DockerError> {
        tracing::trace!("{}", self.command_string(args));
        let result = tokio::time::timeout(
            timeout,
            tokio::process::Command::new(&self.binary)
                .args(args)
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(DockerError::exec_failed(self.command_string(args), e)),
            Err(_) => Err(DockerError::timeout(self.command_string(args), timeout)),
        }
    }

    /// Run a docker command with a timeout, returning Output only if exit 0.
    async fn run_success(&self, args: &[&str], timeout: Duration) -> Result<Output, DockerError> {
        let output = self.run(args, timeout).await?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(DockerError::failed(self.command_string(args), &output))
        }
    }

    // ========================================================================
    // Container lifecycle
    // ========================================================================

    /// Force-remove a container and its anonymous volumes.
    /// Returns `Ok(())` if the container doesn't exist.
    pub async fn rm_force(&self, container: &str, timeout: Duration) -> Result<(), DockerError> {
        match self.run_success(&["rm", "-f", "-v", container], timeout).await {
            Ok(_) | Err(DockerError::ContainerNotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Run a container in detached mode. Returns the container ID on success.
    ///
    /// `args` holds everything after `docker run -d`.
    pub async fn run_detached(
        &self,
        args: &[String],
        timeout: Duration,
    ) -> Result<String, DockerError> {
        let mut full: Vec<&str> = vec!["run", "-d"];
        full.extend(args.iter().map(String::as_str));
        let output = self.run_success(&full, timeout).await?;

        let id = String::from_utf8_lossy(&output.stdout)
            .lines()
            .last()
            .map(|line| line.trim().to_string())
            .unwrap_or_default();
        if id.is_empty() {
            return Err(DockerError::invalid_output(
                self.command_string(&full),
                "no container id printed",
            ));
        }
        Ok(id)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Read gateway and published port bindings of a container.
    pub async fn inspect_network(
        &self,
        container: &str,
        timeout: Duration,
    ) -> Result<NetworkInfo, DockerError> {
        let args = ["inspect", "--format={{json .NetworkSettings}}", container];
        let output = self.run_success(&args, timeout).await?;
        let json = String::from_utf8_lossy(&output.stdout);
        parse_network_settings(&json)
            .map_err(|reason| DockerError::invalid_output(self.command_string(&args), reason))
    }

    /// List container names matching a filter.
    pub async fn ps_names(
        &self,
        filter: &str,
        timeout: Duration,
    ) -> Result<Vec<String>, DockerError> {
        let output = self
            .run_success(
                &["ps", "-a", "--filter", filter, "--format", "{{.Names}}"],
                timeout,
            )
            .await?;
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    // ========================================================================
    // Exec
    // ========================================================================

    /// Run a command inside a container using `sh -c`.
    pub async fn exec_sh(
        &self,
        container: &str,
        shell_cmd: &str,
        timeout: Duration,
    ) -> Result<Output, DockerError> {
        self.run(&["exec", container, "/bin/sh", "-c", shell_cmd], timeout)
            .await
    }

    // ========================================================================
    // Daemon health
    // ========================================================================

    /// Check if the Docker daemon is healthy.
    pub async fn daemon_healthy(&self, timeout: Duration) -> bool {
        match self
            .run(&["info", "--format", "{{.ServerVersion}}"], timeout)
            .await
        {
            Ok(o) => o.status.success(),
            Err(_) => false,
        }
    }
}

impl Default for DockerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNetworkSettings {
    #[serde(default)]
    gateway: Option<String>,
    #[serde(default)]
    ports: Option<HashMap<String, Option<Vec<RawBinding>>>>,
    #[serde(default)]
    networks: Option<BTreeMap<String, RawNetwork>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawBinding {
    #[serde(default)]
    host_port: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNetwork {
    #[serde(default)]
    gateway: Option<String>,
}

/// Parse the output of `docker inspect --format={{json .NetworkSettings}}`.
///
/// Newer engines leave the top-level `Gateway` empty and report it per
/// network only; the `bridge` network wins, otherwise the first by name.
pub(crate) fn parse_network_settings(json: &str) -> Result<NetworkInfo, String> {
    let raw: RawNetworkSettings =
        serde_json::from_str(json.trim()).map_err(|e| e.to_string())?;

    let top_level = raw.gateway.filter(|g| !g.is_empty());
    let gateway = match top_level {
        Some(g) => g,
        None => {
            let networks = raw.networks.unwrap_or_default();
            let preferred = networks
                .get("bridge")
                .and_then(|n| n.gateway.clone())
                .filter(|g| !g.is_empty());
            preferred
                .or_else(|| {
                    networks
                        .values()
                        .filter_map(|n| n.gateway.clone())
                        .find(|g| !g.is_empty())
                })
                .unwrap_or_default()
        }
    };

    let mut ports = HashMap::new();
    for (container_port, bindings) in raw.ports.unwrap_or_default() {
        let host_port = bindings
            .unwrap_or_default()
            .into_iter()
            .map(|b| b.host_port)
            .find(|p| !p.is_empty());
        if let Some(host_port) = host_port {
            ports.insert(container_port, host_port);
        }
    }

    Ok(NetworkInfo { gateway, ports })
}
