use super::{ContainerBuilder, ServiceSpec, Status};
use crate::address::resolve_address;
use crate::context::Context;
use crate::docker::{Engine, Resource};
use crate::error::{Error, Result};
use crate::platform::PlatformProbe;
use crate::readiness::ReadinessChecker;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Handle to one service for the duration of a test run.
///
/// Cloning is cheap and every clone refers to the same service, which is how
/// dependency edges and the [`Registry`](crate::Registry) share handles.
///
/// The resource reference and status are only mutated by whoever drives
/// [`start`](Self::start) and [`wait_ready`](Self::wait_ready); other tasks
/// only read the readiness flag.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    spec: ServiceSpec,
    checker: Arc<dyn ReadinessChecker>,
    platform: Arc<dyn PlatformProbe>,
    poll_interval: Duration,
    /// Set once, never cleared.
    ready: AtomicBool,
    /// Append-only; populated before orchestration begins.
    dependencies: RwLock<Vec<Container>>,
    state: Mutex<State>,
}

struct State {
    status: Status,
    resource: Option<Resource>,
    engine: Option<Arc<dyn Engine>>,
}

impl Container {
    /// Handle for `spec` probed by `checker`, with host platform detection
    /// and the default poll interval.
    pub fn new(spec: ServiceSpec, checker: impl ReadinessChecker + 'static) -> Self {
        Self::builder(spec, checker).build()
    }

    pub fn builder(spec: ServiceSpec, checker: impl ReadinessChecker + 'static) -> ContainerBuilder {
        ContainerBuilder::new(spec, Arc::new(checker))
    }

    pub(super) fn from_parts(
        spec: ServiceSpec,
        checker: Arc<dyn ReadinessChecker>,
        platform: Arc<dyn PlatformProbe>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                spec,
                checker,
                platform,
                poll_interval,
                ready: AtomicBool::new(false),
                dependencies: RwLock::new(Vec::new()),
                state: Mutex::new(State {
                    status: Status::Unstarted,
                    resource: None,
                    engine: None,
                }),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.spec.name
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.inner.spec
    }

    pub fn status(&self) -> Status {
        self.inner.state.lock().status
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Non-blocking read of the readiness flag.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::SeqCst)
    }

    /// The engine resource, once launched.
    pub fn resource(&self) -> Option<Resource> {
        self.inner.state.lock().resource.clone()
    }

    /// Declare `other` as a prerequisite: this service's readiness checker
    /// won't run until `other` is ready. Returns `self` for chaining.
    ///
    /// Must be called before orchestration starts. Cycles are not detected
    /// and end only when the governing context expires.
    pub fn depends_on(&self, other: &Container) -> &Self {
        tracing::debug!("'{}' depends on '{}'", self.name(), other.name());
        self.inner.dependencies.write().push(other.clone());
        self
    }

    /// Names of declared prerequisites, in declaration order.
    pub fn dependencies(&self) -> Vec<String> {
        self.inner
            .dependencies
            .read()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub(crate) fn dependency_handles(&self) -> Vec<Container> {
        self.inner.dependencies.read().clone()
    }

    /// True when both values refer to the same handle, not merely the same name.
    pub(crate) fn same_handle(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read-only view handed to readiness checkers.
    pub fn view(&self) -> ContainerView {
        ContainerView {
            container: self.clone(),
        }
    }

    fn transition(&self, state: &mut State, to: Status) {
        if !state.status.is_valid_transition(to) {
            tracing::warn!(
                "'{}': unexpected status transition {} -> {}",
                self.name(),
                state.status,
                to
            );
        }
        tracing::debug!("'{}': {} -> {}", self.name(), state.status, to);
        state.status = to;
    }

    fn set_status(&self, to: Status) {
        let mut state = self.inner.state.lock();
        self.transition(&mut state, to);
    }

    /// Purge any instance left under this service's name, then launch a
    /// fresh one. Engine failures are returned as [`Error::Provision`] and
    /// are not retried.
    ///
    /// If the context ends while the launch is in flight, the engine may
    /// still create the instance, so it is purged by name before returning.
    pub async fn start(&self, ctx: &Context, engine: Arc<dyn Engine>) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.status != Status::Unstarted {
                return Err(Error::InvalidState {
                    service: self.name().to_string(),
                    operation: "start",
                    status: state.status,
                });
            }
            self.transition(&mut state, Status::Starting);
            state.engine = Some(Arc::clone(&engine));
        }

        let name = self.name().to_string();
        let spec = &self.inner.spec;
        let provision = |source| Error::Provision {
            service: name.clone(),
            source,
        };
        let launch_issued = AtomicBool::new(false);

        let launched = ctx
            .run(async {
                engine.purge(&spec.name).await.map_err(provision)?;
                launch_issued.store(true, Ordering::SeqCst);
                engine.launch(spec).await.map_err(provision)
            })
            .await;

        let abandoned = matches!(&launched, Err(e) if e.is_context_error())
            && launch_issued.load(Ordering::SeqCst);
        if abandoned {
            tracing::debug!("'{}': launch abandoned, purging", name);
            if let Err(e) = engine.purge(&spec.name).await {
                tracing::warn!("Failed to purge abandoned '{}': {}", name, e);
            }
        }

        let mut state = self.inner.state.lock();
        match launched {
            Ok(resource) => {
                tracing::info!("Started '{}' ({})", name, resource.id);
                state.resource = Some(resource);
                self.transition(&mut state, Status::Running);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to start '{}': {}", name, e);
                self.transition(&mut state, Status::Failed);
                Err(e)
            }
        }
    }

    /// Block until every dependency is ready, then until this service's
    /// readiness checker reports it usable.
    ///
    /// Both phases poll on the handle's interval, with the first check
    /// immediate. `Ok(false)` from the checker means "try again"; an error
    /// aborts at once without retry. Context termination returns the
    /// context's own error.
    pub async fn wait_ready(&self, ctx: &Context) -> Result<()> {
        match self.status() {
            Status::Ready => return Ok(()),
            Status::Running => {}
            Status::Unstarted => return Err(Error::NotStarted(self.name().to_string())),
            status => {
                return Err(Error::InvalidState {
                    service: self.name().to_string(),
                    operation: "wait for readiness",
                    status,
                })
            }
        }

        let span = tracing::info_span!("wait_ready", service.name = %self.name());
        let result = async {
            self.wait_for_dependencies(ctx).await?;
            self.wait_for_self(ctx).await
        }
        .instrument(span)
        .await;

        match result {
            Ok(()) => {
                self.mark_ready();
                Ok(())
            }
            Err(e) => {
                self.set_status(Status::Failed);
                Err(e)
            }
        }
    }

    async fn wait_for_dependencies(&self, ctx: &Context) -> Result<()> {
        let dependencies = self.dependency_handles();
        if !dependencies.is_empty() {
            tracing::debug!(
                "Waiting for dependencies of '{}': {:?}",
                self.name(),
                self.dependencies()
            );
        }

        loop {
            if let Some(err) = ctx.err() {
                return Err(err);
            }

            let pending: Vec<&str> = dependencies
                .iter()
                .filter(|dep| !dep.is_ready())
                .map(Container::name)
                .collect();
            if pending.is_empty() {
                return Ok(());
            }
            tracing::trace!("'{}' still waiting for {:?}", self.name(), pending);

            pause(ctx, self.inner.poll_interval).await?;
        }
    }

    async fn wait_for_self(&self, ctx: &Context) -> Result<()> {
        let view = self.view();
        let mut attempts: u32 = 0;

        loop {
            if let Some(err) = ctx.err() {
                return Err(err);
            }

            attempts += 1;
            let ready = ctx.run(self.inner.checker.check(ctx, &view)).await?;
            if ready {
                tracing::info!("'{}' is ready after {} check(s)", self.name(), attempts);
                return Ok(());
            }
            tracing::debug!("'{}' not ready yet, waiting...", self.name());

            pause(ctx, self.inner.poll_interval).await?;
        }
    }

    fn mark_ready(&self) {
        if self
            .inner
            .ready
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.set_status(Status::Ready);
        }
    }

    /// Connection address for a declared container `port`, prefixed with
    /// `scheme://` unless `scheme` is empty.
    pub fn address(&self, scheme: &str, port: &str) -> Result<String> {
        let state = self.inner.state.lock();
        let resource = state
            .resource
            .as_ref()
            .ok_or_else(|| Error::NotStarted(self.name().to_string()))?;
        let host_port = resource
            .mapped_port(port)
            .ok_or_else(|| Error::PortNotExposed {
                service: self.name().to_string(),
                port: port.to_string(),
            })?;
        Ok(resolve_address(
            scheme,
            host_port,
            &resource.gateway,
            self.inner.platform.as_ref(),
        ))
    }

    /// Ask the engine to release this service's resource.
    ///
    /// Teardown always reaches the engine, even when `ctx` has already
    /// ended; each engine call is bounded by the engine's own timeouts.
    /// A handle whose launch failed is purged by name. Stopping a handle
    /// that never launched, or stopping twice, does nothing. If the engine
    /// refuses, the resource is kept so the stop can be retried.
    pub async fn stop(&self, ctx: &Context) -> Result<()> {
        let (resource, engine, status) = {
            let mut state = self.inner.state.lock();
            if state.status == Status::Stopped {
                return Ok(());
            }
            (state.resource.take(), state.engine.clone(), state.status)
        };

        if let Some(err) = ctx.err() {
            tracing::debug!("'{}': releasing despite finished context ({})", self.name(), err);
        }

        let teardown = |source| Error::Teardown {
            service: self.name().to_string(),
            source,
        };

        let released = match (&resource, engine) {
            (Some(resource), Some(engine)) => engine.close(resource).await.map_err(teardown),
            (None, Some(engine)) if status == Status::Failed => {
                tracing::debug!("'{}' has no resource, purging by name", self.name());
                engine.purge(self.name()).await.map_err(teardown)
            }
            _ => {
                tracing::debug!("'{}' has nothing to release", self.name());
                Ok(())
            }
        };

        let mut state = self.inner.state.lock();
        match released {
            Ok(()) => {
                tracing::info!("Stopped '{}'", self.name());
                self.transition(&mut state, Status::Stopped);
                Ok(())
            }
            Err(e) => {
                state.resource = resource;
                Err(e)
            }
        }
    }
}

/// Sleep for one poll interval unless the context ends first.
async fn pause(ctx: &Context, interval: Duration) -> Result<()> {
    ctx.run(async {
        tokio::time::sleep(interval).await;
        Ok(())
    })
    .await
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("ready", &self.is_ready())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// Read-only view of a [`Container`], passed to readiness checkers.
///
/// Checkers can resolve addresses and inspect the resource but cannot
/// change the handle's state.
#[derive(Clone, Debug)]
pub struct ContainerView {
    container: Container,
}

impl ContainerView {
    pub fn name(&self) -> &str {
        self.container.name()
    }

    pub fn spec(&self) -> &ServiceSpec {
        self.container.spec()
    }

    pub fn status(&self) -> Status {
        self.container.status()
    }

    pub fn resource(&self) -> Option<Resource> {
        self.container.resource()
    }

    pub fn address(&self, scheme: &str, port: &str) -> Result<String> {
        self.container.address(scheme, port)
    }
}
