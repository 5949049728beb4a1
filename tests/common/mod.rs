//! Shared fixtures: an in-memory engine and instrumented readiness checkers.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use service_harness::container::{Container, ContainerView, ServiceSpec};
use service_harness::docker::{DockerError, Engine, Resource};
use service_harness::platform::StaticPlatform;
use service_harness::readiness::ReadinessChecker;
use service_harness::{Context, Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const GATEWAY: &str = "172.17.0.2";
pub const POLL: Duration = Duration::from_millis(100);

/// Engine that records every call and never touches Docker.
#[derive(Default)]
pub struct FakeEngine {
    gateway: Option<String>,
    launch_delay: Duration,
    fail_purge: HashSet<String>,
    fail_launch: HashSet<String>,
    fail_close: HashSet<String>,
    host_ports: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gateway(mut self, gateway: &str) -> Self {
        self.gateway = Some(gateway.to_string());
        self
    }

    pub fn with_launch_delay(mut self, delay: Duration) -> Self {
        self.launch_delay = delay;
        self
    }

    pub fn failing_purge(mut self, name: &str) -> Self {
        self.fail_purge.insert(name.to_string());
        self
    }

    pub fn failing_launch(mut self, name: &str) -> Self {
        self.fail_launch.insert(name.to_string());
        self
    }

    pub fn failing_close(mut self, name: &str) -> Self {
        self.fail_close.insert(name.to_string());
        self
    }

    /// Publish container `port` on a fixed host port instead of a generated one.
    pub fn with_host_port(mut self, port: &str, host_port: u16) -> Self {
        self.host_ports.insert(port.to_string(), host_port.to_string());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn purge(&self, name: &str) -> std::result::Result<(), DockerError> {
        self.record(format!("purge:{}", name));
        if self.fail_purge.contains(name) {
            return Err(DockerError::cmd_failed("docker rm -f", "device busy", Some(1)));
        }
        Ok(())
    }

    async fn launch(&self, spec: &ServiceSpec) -> std::result::Result<Resource, DockerError> {
        self.record(format!("launch:{}", spec.name));
        if !self.launch_delay.is_zero() {
            tokio::time::sleep(self.launch_delay).await;
        }
        if self.fail_launch.contains(&spec.name) {
            return Err(DockerError::cmd_failed(
                "docker run",
                "pull access denied",
                Some(125),
            ));
        }

        let ports = spec
            .ports
            .iter()
            .enumerate()
            .map(|(i, port)| {
                let host_port = self
                    .host_ports
                    .get(port)
                    .cloned()
                    .unwrap_or_else(|| (40000 + i).to_string());
                (format!("{}/tcp", port), host_port)
            })
            .collect();

        Ok(Resource {
            id: format!("fake-{}", spec.name),
            name: spec.name.clone(),
            gateway: self.gateway.clone().unwrap_or_else(|| GATEWAY.to_string()),
            ports,
        })
    }

    async fn close(&self, resource: &Resource) -> std::result::Result<(), DockerError> {
        self.record(format!("close:{}", resource.name));
        if self.fail_close.contains(&resource.name) {
            return Err(DockerError::ContainerNotFound {
                container: resource.id.clone(),
            });
        }
        Ok(())
    }
}

/// What a [`ProbeChecker`] observed.
#[derive(Default)]
pub struct Probe {
    calls: AtomicUsize,
    first_call: Mutex<Option<Instant>>,
    ready_at: Mutex<Option<Instant>>,
}

impl Probe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn first_call(&self) -> Option<Instant> {
        *self.first_call.lock()
    }

    pub fn ready_at(&self) -> Option<Instant> {
        *self.ready_at.lock()
    }
}

enum Behavior {
    /// Ready from the n-th call on
    ReadyAfter(usize),
    Never,
    Fatal(&'static str),
}

/// Checker with scripted answers that records when it was called.
pub struct ProbeChecker {
    behavior: Behavior,
    /// Simulated time a single check takes
    latency: Duration,
    probe: Arc<Probe>,
}

impl ProbeChecker {
    pub fn ready_after(calls: usize) -> (Self, Arc<Probe>) {
        Self::with_behavior(Behavior::ReadyAfter(calls.max(1)))
    }

    pub fn never() -> (Self, Arc<Probe>) {
        Self::with_behavior(Behavior::Never)
    }

    pub fn fatal(reason: &'static str) -> (Self, Arc<Probe>) {
        Self::with_behavior(Behavior::Fatal(reason))
    }

    fn with_behavior(behavior: Behavior) -> (Self, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        (
            Self {
                behavior,
                latency: Duration::ZERO,
                probe: Arc::clone(&probe),
            },
            probe,
        )
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl ReadinessChecker for ProbeChecker {
    async fn check(&self, _ctx: &Context, container: &ContainerView) -> Result<bool> {
        let call = self.probe.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.first_call.lock().get_or_insert_with(Instant::now);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let ready = match self.behavior {
            Behavior::ReadyAfter(n) => call >= n,
            Behavior::Never => false,
            Behavior::Fatal(reason) => return Err(Error::readiness(container.name(), reason)),
        };
        if ready {
            self.probe.ready_at.lock().get_or_insert_with(Instant::now);
        }
        Ok(ready)
    }
}

/// Checker that panics on its first call.
pub struct PanickingChecker;

#[async_trait]
impl ReadinessChecker for PanickingChecker {
    async fn check(&self, _ctx: &Context, container: &ContainerView) -> Result<bool> {
        panic!("checker for '{}' exploded", container.name())
    }
}

/// A handle on a plain host exposing port 80.
pub fn container(name: &str, checker: impl ReadinessChecker + 'static) -> Container {
    container_on(name, checker, StaticPlatform::new(false, false))
}

pub fn container_on(
    name: &str,
    checker: impl ReadinessChecker + 'static,
    platform: StaticPlatform,
) -> Container {
    service_harness::telemetry::init_tracing();
    Container::builder(ServiceSpec::new(name, "example/image").expose("80"), checker)
        .platform(platform)
        .poll_interval(POLL)
        .build()
}

pub fn timeout(d: Duration) -> Context {
    Context::background().with_timeout(d)
}
