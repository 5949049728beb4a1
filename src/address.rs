//! Connection address resolution for launched services.

use crate::platform::PlatformProbe;

pub const LOOPBACK: &str = "127.0.0.1";

/// Qualify a container port with a protocol, defaulting to tcp.
///
/// `"6379"` becomes `"6379/tcp"`; `"53/udp"` is returned unchanged.
pub fn normalize_port(port: &str) -> String {
    let port = port.trim();
    if port.contains('/') {
        port.to_string()
    } else {
        format!("{}/tcp", port)
    }
}

/// Build the address test code uses to reach a service.
///
/// The host is the container network's `gateway`, except when this process
/// is itself nested in a container on a platform with the bridge
/// networking quirk, where only loopback reaches published ports.
/// An empty `scheme` yields a bare `host:port`.
pub fn resolve_address(
    scheme: &str,
    host_port: &str,
    gateway: &str,
    platform: &dyn PlatformProbe,
) -> String {
    let host = if platform.is_running_nested() && platform.has_networking_quirk() {
        LOOPBACK
    } else {
        gateway
    };

    if scheme.is_empty() {
        format!("{}:{}", host, host_port)
    } else {
        format!("{}://{}:{}", scheme, host, host_port)
    }
}
