use super::ReadinessChecker;
use crate::config::{Settings, DEFAULT_ATTEMPT_TIMEOUT};
use crate::container::ContainerView;
use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

/// How long an accepted connection must stay open before it counts.
const DEFAULT_SETTLE: Duration = Duration::from_millis(100);

/// Ready once a TCP connection to the published port is accepted and not
/// immediately closed.
///
/// Docker's port proxy accepts connections before the service listens and
/// then drops them, so an accept alone proves nothing. Refused, reset or
/// timed-out connections count as "not ready". A port the engine never
/// published is fatal.
#[derive(Debug, Clone)]
pub struct TcpChecker {
    port: String,
    timeout: Duration,
    settle: Duration,
}

impl TcpChecker {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            settle: DEFAULT_SETTLE,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound each attempt by `settings.attempt_timeout`.
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_timeout(settings.attempt_timeout)
    }
}

#[async_trait]
impl ReadinessChecker for TcpChecker {
    async fn check(&self, _ctx: &Context, container: &ContainerView) -> Result<bool> {
        let addr = container.address("", &self.port)?;
        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                let mut buf = [0u8; 1];
                match tokio::time::timeout(self.settle, stream.peek(&mut buf)).await {
                    // Closed straight away: nothing behind the proxy yet
                    Ok(Ok(0)) | Ok(Err(_)) => Ok(false),
                    // Banner received, or silence while held open
                    Ok(Ok(_)) | Err(_) => Ok(true),
                }
            }
            Ok(Err(e)) => {
                tracing::trace!("'{}': connect to {} failed: {}", container.name(), addr, e);
                Ok(false)
            }
            Err(_) => Ok(false),
        }
    }
}
