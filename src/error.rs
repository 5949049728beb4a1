// thiserror's expansion for struct variants trips unused_assignments
#![allow(unused_assignments)]

use crate::docker::DockerError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Failed to provision '{service}': {source}")]
    #[diagnostic(
        code(harness::provision::failed),
        help("Check that Docker is running with `docker ps` and that the image can be pulled")
    )]
    Provision {
        service: String,
        #[source]
        source: DockerError,
    },

    #[error("Container engine error: {0}")]
    #[diagnostic(
        code(harness::engine::error),
        help("Check that Docker is running with `docker ps`")
    )]
    Engine(#[from] DockerError),

    #[error("Readiness check for '{service}' failed: {reason}")]
    #[diagnostic(
        code(harness::readiness::failed),
        help("Inspect the container logs with `docker logs {service}`")
    )]
    Readiness { service: String, reason: String },

    #[error("Context cancelled")]
    #[diagnostic(code(harness::context::cancelled))]
    Cancelled,

    #[error("Context deadline exceeded")]
    #[diagnostic(
        code(harness::context::deadline_exceeded),
        help("A service did not become ready in time. Check for slow image pulls or cyclic depends_on declarations")
    )]
    DeadlineExceeded,

    #[error("Service '{0}' has not been started")]
    #[diagnostic(
        code(harness::container::not_started),
        help("Call `start` (or `Registry::start_and_wait_ready`) before resolving addresses")
    )]
    NotStarted(String),

    #[error("Service '{service}' does not expose port {port}")]
    #[diagnostic(
        code(harness::container::port_not_exposed),
        help("Add the port to the service's exposed ports so the engine publishes it")
    )]
    PortNotExposed { service: String, port: String },

    #[error("Service '{service}' cannot {operation} while {status}")]
    #[diagnostic(code(harness::container::invalid_state))]
    InvalidState {
        service: String,
        operation: &'static str,
        status: crate::container::Status,
    },

    #[error("Service '{0}' is already registered")]
    #[diagnostic(
        code(harness::registry::duplicate),
        help("Service names must be unique within a registry")
    )]
    DuplicateService(String),

    #[error("Service not found: {0}")]
    #[diagnostic(code(harness::registry::not_found))]
    ServiceNotFound(String),

    #[error("Service '{service}' depends on '{dependency}', which is not registered")]
    #[diagnostic(
        code(harness::registry::unknown_dependency),
        help("Add '{dependency}' to the registry, otherwise '{service}' can never become ready")
    )]
    UnknownDependency { service: String, dependency: String },

    #[error("Orchestration task for '{service}' panicked: {message}")]
    #[diagnostic(code(harness::registry::panicked))]
    TaskPanicked { service: String, message: String },

    #[error("Failed to tear down '{service}': {source}")]
    #[diagnostic(code(harness::teardown::failed))]
    Teardown {
        service: String,
        #[source]
        source: DockerError,
    },

    #[error("Configuration error: {0}")]
    #[diagnostic(code(harness::config::invalid))]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a fatal readiness error for use inside checkers.
    pub fn readiness(service: impl Into<String>, reason: impl ToString) -> Self {
        Error::Readiness {
            service: service.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that originate from the governing [`Context`](crate::Context)
    /// rather than from a service.
    pub fn is_context_error(&self) -> bool {
        matches!(self, Error::Cancelled | Error::DeadlineExceeded)
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::Provision { source, .. } => match source {
                DockerError::DaemonUnavailable | DockerError::ExecFailed { .. } => {
                    Some("Check that Docker is installed and running: docker ps".to_string())
                }
                DockerError::Timeout { .. } => Some(
                    "The engine call timed out. Raise HARNESS_LAUNCH_TIMEOUT for slow image pulls."
                        .to_string(),
                ),
                _ => None,
            },
            Error::DeadlineExceeded => Some(
                "Increase the context timeout, or check depends_on for cycles (A -> B -> A never becomes ready)."
                    .to_string(),
            ),
            Error::UnknownDependency { dependency, .. } => Some(format!(
                "Register '{}' with Registry::add before calling start_and_wait_ready.",
                dependency
            )),
            Error::Config(_) => Some(
                "Duration settings accept values like \"100ms\", \"5s\" or \"2m\".".to_string(),
            ),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
