//! Readiness checks for launched services.
//!
//! A [`ReadinessChecker`] answers one question, repeatedly: is this service
//! usable yet? `Ok(false)` means "not yet" and the caller polls again;
//! `Err` is fatal and ends the wait immediately. Checkers must not keep
//! state between calls and never change the container they inspect.
//!
//! Closures are adapted with [`readiness_fn`]. Protocol-agnostic checkers
//! ship with the crate: [`TcpChecker`], [`HttpChecker`] and [`ExecChecker`].

mod exec;
mod http;
mod tcp;

pub use exec::ExecChecker;
pub use http::HttpChecker;
pub use tcp::TcpChecker;

use crate::container::ContainerView;
use crate::context::Context;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;

/// Reports whether a running service is usable.
#[async_trait]
pub trait ReadinessChecker: Send + Sync {
    async fn check(&self, ctx: &Context, container: &ContainerView) -> Result<bool>;
}

/// [`ReadinessChecker`] backed by a closure. Build with [`readiness_fn`].
pub struct ReadinessFn<F> {
    f: F,
}

/// Adapt an async closure into a [`ReadinessChecker`].
///
/// ```
/// use service_harness::readiness::readiness_fn;
///
/// let checker = readiness_fn(|_ctx, view| async move {
///     let _addr = view.address("redis", "6379")?;
///     Ok::<_, service_harness::Error>(true)
/// });
/// # let _ = checker;
/// ```
pub fn readiness_fn<F, Fut>(f: F) -> ReadinessFn<F>
where
    F: Fn(Context, ContainerView) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    ReadinessFn { f }
}

#[async_trait]
impl<F, Fut> ReadinessChecker for ReadinessFn<F>
where
    F: Fn(Context, ContainerView) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send,
{
    async fn check(&self, ctx: &Context, container: &ContainerView) -> Result<bool> {
        (self.f)(ctx.clone(), container.clone()).await
    }
}

/// Checker for services without a meaningful probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

pub fn always_ready() -> AlwaysReady {
    AlwaysReady
}

#[async_trait]
impl ReadinessChecker for AlwaysReady {
    async fn check(&self, _ctx: &Context, _container: &ContainerView) -> Result<bool> {
        Ok(true)
    }
}
