use super::ReadinessChecker;
use crate::config::{Settings, DEFAULT_ATTEMPT_TIMEOUT};
use crate::container::ContainerView;
use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// Shared HTTP client so many checkers reuse one connection pool.
static SHARED_HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn shared_client() -> &'static Client {
    SHARED_HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Ready once `GET http://<address><path>` answers with a 2xx status.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    port: String,
    path: String,
    timeout: Duration,
    client: Client,
}

impl HttpChecker {
    pub fn new(port: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        Self {
            port: port.into(),
            path,
            timeout: DEFAULT_ATTEMPT_TIMEOUT,
            client: shared_client().clone(),
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

    fn url(&self, container: &ContainerView) -> Result<String> {
        Ok(format!("{}{}", container.address("http", &self.port)?, self.path))
    }
}

#[async_trait]
impl ReadinessChecker for HttpChecker {
    async fn check(&self, _ctx: &Context, container: &ContainerView) -> Result<bool> {
        let url = self.url(container)?;
        // Per-request timeout overrides the shared client's default
        match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::trace!("'{}': GET {} failed: {}", container.name(), url, e);
                Ok(false)
            }
        }
    }
}
