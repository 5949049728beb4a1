//! # Service Harness
//!
//! Provisions ephemeral backing services (databases, brokers, caches) for
//! integration tests, waits until each one is usable while honoring declared
//! dependencies, hands out connection addresses and tears everything down.
//!
//! ## Quick Start
//!
//! ```no_run
//! use service_harness::{presets, Context, DockerEngine, Registry, Settings};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> service_harness::Result<()> {
//! let engine = DockerEngine::connect(Settings::from_env()?).await?;
//!
//! let db = presets::postgres();
//! let cache = presets::redis();
//! // Don't probe redis until postgres is ready
//! cache.depends_on(&db);
//!
//! let registry = Registry::new(Arc::new(engine));
//! registry.add(db).add(cache);
//!
//! let ctx = Context::background().with_timeout(Duration::from_secs(120));
//! registry.start_and_wait_ready(&ctx).await?;
//!
//! let db = registry.get("postgres")?;
//! println!("postgres at {}", presets::postgres_dsn(&db)?);
//!
//! registry.stop(&Context::background()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! - [`Registry::start_and_wait_ready`] runs one task per service and fails
//!   fast: the first error cancels the rest
//! - [`Container::wait_ready`] polls dependency flags, then the service's own
//!   [`ReadinessChecker`], on a fixed interval (100ms by default)
//! - A [`Context`] bounds every wait; cancellation is observed within one interval
//! - Dependency cycles are not detected and end at the context deadline

pub mod address;
pub mod config;
pub mod container;
pub mod context;
pub mod docker;
pub mod error;
pub mod platform;
pub mod presets;
pub mod readiness;
pub mod registry;
pub mod telemetry;

// Re-export commonly used types
pub use config::Settings;
pub use container::{Container, ContainerView, ServiceSpec, Status};
pub use context::Context;
pub use docker::{DockerEngine, DockerError, Engine, Resource};
pub use error::{Error, Result};
pub use platform::{HostPlatform, PlatformProbe, StaticPlatform};
pub use readiness::{readiness_fn, ReadinessChecker};
pub use registry::Registry;
