//! Harness configuration.
//!
//! - `duration` - human-readable duration parsing
//! - `settings` - [`Settings`] with `HARNESS_*` environment overrides

mod duration;
mod settings;

pub use duration::*;
pub use settings::*;
