//! Per-service lifecycle handles.
//!
//! A [`Container`] owns a [`ServiceSpec`], the engine [`Resource`](crate::docker::Resource)
//! once launched, and a one-way readiness flag. Handles declare prerequisites with
//! [`Container::depends_on`]; [`Container::wait_ready`] will not probe a service
//! until every prerequisite has reported ready.

mod builder;
mod handle;
mod spec;
mod status;

pub use builder::ContainerBuilder;
pub use handle::{Container, ContainerView};
pub use spec::ServiceSpec;
pub use status::Status;
