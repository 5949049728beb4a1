use std::time::Duration;
use thiserror::Error;

/// Failure of a single engine call.
///
/// [`Engine`](super::Engine) implementations report with these variants so
/// a missing daemon, a dead container and a failed `docker run` stay
/// distinguishable.
#[derive(Error, Debug)]
pub enum DockerError {
    #[error("'{command}' did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Non-zero exit.
    #[error("'{command}' failed{}: {stderr}", exit_suffix(.exit_code))]
    CommandFailed {
        command: String,
        stderr: String,
        exit_code: Option<i32>,
    },

    /// The CLI binary could not be spawned at all.
    #[error("Could not run '{command}': {source}")]
    ExecFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("No such container: {container}")]
    ContainerNotFound { container: String },

    #[error("Docker daemon is not responding")]
    DaemonUnavailable,

    /// Exit 0, but stdout was not what the caller expected.
    #[error("Unexpected output from '{command}': {reason}")]
    InvalidOutput { command: String, reason: String },
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|code| format!(" (exit code {})", code))
        .unwrap_or_default()
}

impl DockerError {
    pub fn timeout(command: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            command: command.into(),
            timeout,
        }
    }

    /// Classify a non-zero exit from its captured output. "No such container"
    /// becomes [`DockerError::ContainerNotFound`].
    pub fn failed(command: impl Into<String>, output: &std::process::Output) -> Self {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match parse_missing_container(&stderr) {
            Some(container) => Self::ContainerNotFound { container },
            None => Self::cmd_failed(command, stderr, output.status.code()),
        }
    }

    pub fn cmd_failed(
        command: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn exec_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::ExecFailed {
            command: command.into(),
            source,
        }
    }

    pub fn invalid_output(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOutput {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

fn parse_missing_container(stderr: &str) -> Option<String> {
    let (_, rest) = stderr.split_once("No such container:")?;
    rest.split_whitespace().next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_container_is_recognized() {
        assert_eq!(
            parse_missing_container("Error response from daemon: No such container: mongo"),
            Some("mongo".to_string())
        );
        assert_eq!(parse_missing_container("permission denied"), None);
    }

    #[test]
    fn display_includes_exit_code_when_known() {
        let err = DockerError::cmd_failed("docker run", "pull access denied", Some(125));
        assert_eq!(
            err.to_string(),
            "'docker run' failed (exit code 125): pull access denied"
        );

        let err = DockerError::cmd_failed("docker run", "killed", None);
        assert_eq!(err.to_string(), "'docker run' failed: killed");
    }

    #[test]
    fn exec_failure_keeps_io_source() {
        let err = DockerError::exec_failed(
            "docker info",
            std::io::Error::new(std::io::ErrorKind::NotFound, "docker: not found"),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("Could not run 'docker info'"));
    }
}
