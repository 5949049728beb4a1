//! Host platform detection used by address resolution.
//!
//! Detection is exposed through the [`PlatformProbe`] trait so address
//! resolution can be tested with fixed answers instead of the real host.

use std::path::Path;

/// Marker file Docker creates at the root of every container filesystem.
const DOCKERENV_MARKER: &str = "/.dockerenv";

/// Answers questions about where the test process is running.
pub trait PlatformProbe: Send + Sync + std::fmt::Debug {
    /// True when the test process itself runs inside a container.
    fn is_running_nested(&self) -> bool;

    /// True when the host OS cannot route from a nested container to the
    /// bridge gateway (Docker Desktop on macOS), so published ports must be
    /// reached through loopback instead.
    fn has_networking_quirk(&self) -> bool;
}

/// The real host this process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostPlatform;

impl PlatformProbe for HostPlatform {
    fn is_running_nested(&self) -> bool {
        Path::new(DOCKERENV_MARKER).exists()
    }

    fn has_networking_quirk(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

/// Fixed answers, for tests and for callers that already know their environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticPlatform {
    pub nested: bool,
    pub networking_quirk: bool,
}

impl StaticPlatform {
    pub fn new(nested: bool, networking_quirk: bool) -> Self {
        Self {
            nested,
            networking_quirk,
        }
    }
}

impl PlatformProbe for StaticPlatform {
    fn is_running_nested(&self) -> bool {
        self.nested
    }

    fn has_networking_quirk(&self) -> bool {
        self.networking_quirk
    }
}
