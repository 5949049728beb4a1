//! Named collection of container handles with concurrent orchestration.

use crate::container::Container;
use crate::context::Context;
use crate::docker::Engine;
use crate::error::{Error, Result};
use futures::FutureExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::Instrument;

/// Service name to handle mapping, plus the engine every handle launches on.
///
/// # Example
///
/// ```no_run
/// use service_harness::{presets, Context, DockerEngine, Registry, Settings};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> service_harness::Result<()> {
/// let engine = DockerEngine::connect(Settings::from_env()?).await?;
/// let registry = Registry::new(Arc::new(engine));
/// registry.add(presets::mongo()).add(presets::redis());
///
/// let ctx = Context::background().with_timeout(Duration::from_secs(60));
/// registry.start_and_wait_ready(&ctx).await?;
///
/// let mongo = registry.by_name("mongo").expect("registered above");
/// println!("{}", presets::mongo_dsn(&mongo)?);
///
/// registry.stop(&ctx).await?;
/// # Ok(())
/// # }
/// ```
pub struct Registry {
    engine: Arc<dyn Engine>,
    containers: RwLock<HashMap<String, Container>>,
}

impl Registry {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            containers: RwLock::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Register a handle under its service name. A handle already
    /// registered under that name is replaced. Returns `self` for chaining.
    pub fn add(&self, container: Container) -> &Self {
        let name = container.name().to_string();
        if self.containers.write().insert(name.clone(), container).is_some() {
            tracing::warn!("Service '{}' registered twice; keeping the latest", name);
        }
        self
    }

    /// Like [`add`](Self::add) but refuses to replace an existing registration.
    pub fn try_add(&self, container: Container) -> Result<&Self> {
        let mut containers = self.containers.write();
        if containers.contains_key(container.name()) {
            return Err(Error::DuplicateService(container.name().to_string()));
        }
        containers.insert(container.name().to_string(), container);
        Ok(self)
    }

    pub fn by_name(&self, name: &str) -> Option<Container> {
        self.containers.read().get(name).cloned()
    }

    /// Like [`by_name`](Self::by_name), with a descriptive error.
    pub fn get(&self, name: &str) -> Result<Container> {
        self.by_name(name)
            .ok_or_else(|| Error::ServiceNotFound(name.to_string()))
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.containers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.containers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Container> {
        self.containers.read().values().cloned().collect()
    }

    /// Reject prerequisites that can never become ready: handles that are
    /// neither registered here nor already ready on their own.
    fn check_dependencies(&self, containers: &[Container]) -> Result<()> {
        let registered = self.containers.read();
        for container in containers {
            for dependency in container.dependency_handles() {
                let is_registered = registered
                    .get(dependency.name())
                    .is_some_and(|c| c.same_handle(&dependency));
                if !is_registered && !dependency.is_ready() {
                    return Err(Error::UnknownDependency {
                        service: container.name().to_string(),
                        dependency: dependency.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Start every registered service and wait until all are ready.
    ///
    /// Each handle runs `start` then `wait_ready` in its own task. The first
    /// failure cancels a context shared by all tasks, so the others unwind
    /// within one poll interval, and that first error is returned. Errors
    /// observed after it are only logged.
    pub async fn start_and_wait_ready(&self, ctx: &Context) -> Result<()> {
        let containers = self.snapshot();
        self.check_dependencies(&containers)?;

        tracing::info!("Starting {} service(s)", containers.len());

        let group = ctx.child();
        let mut tasks = JoinSet::new();

        for container in containers {
            let ctx = group.clone();
            let engine = Arc::clone(&self.engine);
            let name = container.name().to_string();
            let span = tracing::info_span!("provision", service.name = %name);

            tasks.spawn(
                async move {
                    let result = AssertUnwindSafe(async {
                        container.start(&ctx, engine).await?;
                        container.wait_ready(&ctx).await
                    })
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(Error::TaskPanicked {
                            service: name.clone(),
                            message: panic_message(panic.as_ref()),
                        })
                    });
                    (name, result)
                }
                .instrument(span),
            );
        }

        let mut first_error: Option<Error> = None;

        while let Some(joined) = tasks.join_next().await {
            let (service, result) = match joined {
                Ok(outcome) => outcome,
                Err(join_error) => (
                    "<unknown>".to_string(),
                    Err(Error::TaskPanicked {
                        service: "<unknown>".to_string(),
                        message: join_error.to_string(),
                    }),
                ),
            };

            match result {
                Ok(()) => tracing::debug!("'{}' is up", service),
                Err(e) if first_error.is_none() => {
                    tracing::warn!("'{}' failed, cancelling remaining services: {}", service, e);
                    group.cancel();
                    first_error = Some(e);
                }
                Err(e) => tracing::debug!("'{}' also failed: {}", service, e),
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("All services ready");
                Ok(())
            }
        }
    }

    /// Stop every registered service concurrently.
    ///
    /// One failure does not skip the others; the first error is returned
    /// after all stops have finished.
    pub async fn stop(&self, ctx: &Context) -> Result<()> {
        let containers = self.snapshot();
        tracing::info!("Stopping {} service(s)", containers.len());

        let results = futures::future::join_all(containers.iter().map(|c| c.stop(ctx))).await;

        let mut first_error = None;
        for (container, result) in containers.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!("Failed to stop '{}': {}", container.name(), e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("services", &self.names())
            .finish()
    }
}
