use super::{Container, ServiceSpec};
use crate::config::{Settings, DEFAULT_POLL_INTERVAL};
use crate::platform::{HostPlatform, PlatformProbe};
use crate::readiness::ReadinessChecker;
use std::sync::Arc;
use std::time::Duration;

/// Builder for a [`Container`] with non-default platform or polling settings.
///
/// # Example
///
/// ```
/// use service_harness::container::{Container, ServiceSpec};
/// use service_harness::platform::StaticPlatform;
/// use service_harness::readiness::always_ready;
/// use std::time::Duration;
///
/// let cache = Container::builder(ServiceSpec::new("cache", "redis"), always_ready())
///     .platform(StaticPlatform::new(false, false))
///     .poll_interval(Duration::from_millis(50))
///     .build();
/// assert_eq!(cache.name(), "cache");
/// ```
pub struct ContainerBuilder {
    spec: ServiceSpec,
    checker: Arc<dyn ReadinessChecker>,
    platform: Arc<dyn PlatformProbe>,
    poll_interval: Duration,
}

impl ContainerBuilder {
    pub(super) fn new(spec: ServiceSpec, checker: Arc<dyn ReadinessChecker>) -> Self {
        Self {
            spec,
            checker,
            platform: Arc::new(HostPlatform),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Replace host detection, e.g. with a [`StaticPlatform`](crate::platform::StaticPlatform).
    pub fn platform(mut self, platform: impl PlatformProbe + 'static) -> Self {
        self.platform = Arc::new(platform);
        self
    }

    /// Interval between readiness polls. Zero is raised to one millisecond.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Take the poll interval from shared [`Settings`].
    pub fn settings(self, settings: &Settings) -> Self {
        self.poll_interval(settings.poll_interval)
    }

    pub fn build(self) -> Container {
        Container::from_parts(self.spec, self.checker, self.platform, self.poll_interval)
    }
}
